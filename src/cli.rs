//! Command-line interface for emoji-forge.
//!
//! Provides the `enrich` command that runs the full enrichment pipeline and
//! the `search` command that queries an already-assembled dataset.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::assemble;
use crate::catalog;
use crate::config::PipelineConfig;
use crate::llm::ChatClient;
use crate::pipeline::Pipeline;
use crate::search::SearchIndex;
use crate::store::CacheStore;

/// Default source catalog path.
const DEFAULT_SOURCE: &str = "./emojis.json";

/// Default output path for the enriched dataset.
const DEFAULT_OUTPUT: &str = "./emojis-expanded.json";

/// Default path for the incremental metadata cache.
const DEFAULT_CACHE: &str = "./metadata-cache.json";

/// LLM-backed emoji metadata enrichment.
#[derive(Parser)]
#[command(name = "emoji-forge")]
#[command(about = "Enrich an emoji catalog with LLM-generated search metadata")]
#[command(version)]
#[command(
    long_about = "emoji-forge enriches a categorized emoji catalog with model-generated \
keywords, emoticons, descriptions, tags, and country codes.\n\nRuns are incremental: \
enriched items are cached per glyph, so an interrupted run resumes where it stopped.\n\n\
Example usage:\n  emoji-forge enrich --source ./emojis.json --output ./emojis-expanded.json\n  \
emoji-forge search \"heart\""
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Enrich the source catalog and assemble the final dataset.
    Enrich(EnrichArgs),

    /// Search an assembled dataset.
    Search(SearchArgs),
}

/// Arguments for `emoji-forge enrich`.
#[derive(Parser, Debug)]
pub struct EnrichArgs {
    /// Source catalog JSON (category -> subcategory -> entries).
    #[arg(short, long, default_value = DEFAULT_SOURCE)]
    pub source: PathBuf,

    /// Output path for the enriched dataset.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Path for the incremental per-glyph metadata cache.
    #[arg(long, default_value = DEFAULT_CACHE)]
    pub cache: PathBuf,

    /// Items packed into a single model request.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum number of in-flight model requests.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Model identifier (overrides EMOJI_FORGE_MODEL).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (overrides EMOJI_FORGE_API_BASE).
    #[arg(long)]
    pub api_base: Option<String>,

    /// API key (can also be set via EMOJI_FORGE_API_KEY).
    #[arg(long, env = "EMOJI_FORGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Arguments for `emoji-forge search`.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Search query (name, keyword, tag, emoticon, or country code).
    pub query: String,

    /// Enriched dataset to search.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub dataset: PathBuf,

    /// Maximum number of results to print.
    #[arg(short = 'n', long, default_value = "50")]
    pub max_results: usize,
}

/// Parse CLI arguments without executing any command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Enrich(args) => run_enrich_command(args).await,
        Commands::Search(args) => run_search_command(args),
    }
}

async fn run_enrich_command(args: EnrichArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::overrides_from_env()?;
    // Flags win over the environment. The key already falls back to
    // EMOJI_FORGE_API_KEY through clap.
    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent = concurrency;
    }
    config.validate()?;

    let catalog = catalog::load_catalog(&args.source)?;
    let items = catalog::flatten(&catalog);

    let provider = Arc::new(ChatClient::new(
        config.api_base.clone(),
        config.api_key.clone(),
        config.request_timeout,
    ));
    info!(
        source = %args.source.display(),
        items = items.len(),
        model = %config.model,
        api_key = %provider.api_key_masked(),
        batch_size = config.batch_size,
        concurrency = config.max_concurrent,
        "Starting enrichment"
    );
    let store = CacheStore::new(&args.cache);
    let pipeline = Pipeline::new(config, store, provider);

    let outcome = pipeline.run(items.clone()).await;
    let written = assemble::write_dataset(&items, &outcome.cache, &args.output)?;

    let summary = &outcome.summary;
    info!(
        records = written,
        enriched = summary.enriched,
        failed = summary.failed,
        skipped_cached = summary.skipped_cached,
        elapsed_secs = summary.elapsed_secs,
        output = %args.output.display(),
        "Done"
    );
    if summary.failed > 0 {
        warn!(
            failed = summary.failed,
            "Some items were not enriched; rerun to retry them"
        );
    }
    Ok(())
}

fn run_search_command(args: SearchArgs) -> anyhow::Result<()> {
    let index = SearchIndex::load(&args.dataset)?;
    let results = index.search(&args.query, args.max_results);

    if results.is_empty() {
        println!("No results for {:?}", args.query);
        return Ok(());
    }

    for emoji in &results {
        if emoji.description.is_empty() {
            println!("{}  {}", emoji.emoji, emoji.name);
        } else {
            println!("{}  {} - {}", emoji.emoji, emoji.name, emoji.description);
        }
    }
    info!(query = %args.query, results = results.len(), "Search complete");
    Ok(())
}
