//! Pipeline orchestrator.
//!
//! Drives a full enrichment run: load the cache, plan the pending batches,
//! fan them out with bounded concurrency, checkpoint results after each
//! batch, and report aggregate counters at the end.
//!
//! Batch failures are contained. A batch that exhausts its retries is
//! counted and logged, and the run continues; only an unreadable source or
//! an unwritable final output aborts a run, and those are handled by the
//! caller around this module.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;

use crate::assemble::merge_record;
use crate::catalog::{filter_uncached, partition, EmojiEntry};
use crate::config::PipelineConfig;
use crate::enrich::BatchEnricher;
use crate::llm::LlmProvider;
use crate::store::{CacheMap, CacheStore};

/// Aggregate counters for one enrichment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Items in the flattened source catalog.
    pub total: usize,
    /// Items already present in the cache and skipped.
    pub skipped_cached: usize,
    /// Items newly enriched during this run.
    pub enriched: usize,
    /// Items that ended the run without a record (invalid elements plus
    /// members of failed batches).
    pub failed: usize,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_secs: u64,
}

/// Result of a run: the summary plus the cache contents after the run,
/// including records that could not be persisted but survived in memory.
pub struct RunOutcome {
    pub summary: RunSummary,
    pub cache: CacheMap,
}

/// Orchestrates enrichment of a flattened catalog.
pub struct Pipeline {
    config: PipelineConfig,
    store: CacheStore,
    enricher: Arc<BatchEnricher>,
}

impl Pipeline {
    /// Creates a pipeline from validated configuration, a cache store, and
    /// an LLM provider.
    pub fn new(config: PipelineConfig, store: CacheStore, provider: Arc<dyn LlmProvider>) -> Self {
        let enricher = Arc::new(BatchEnricher::new(
            provider,
            config.model.clone(),
            config.retry_attempts,
            config.retry_delay,
        ));
        Self {
            config,
            store,
            enricher,
        }
    }

    /// Runs enrichment over `items`, returning the summary and the final
    /// cache contents.
    ///
    /// Items whose glyph is already cached are skipped. Batches complete in
    /// arbitrary order; each completed batch is checkpointed to the store
    /// before the next counter update, so an interrupted run loses at most
    /// the in-flight batches.
    ///
    /// Never aborts mid-run: batch failures and cache write failures are
    /// counted or logged and the run continues.
    pub async fn run(&self, items: Vec<EmojiEntry>) -> RunOutcome {
        let started = Instant::now();
        let total = items.len();

        let mut cache = self.store.load().await;
        let pending = filter_uncached(items, &cache);
        let skipped_cached = total - pending.len();

        tracing::info!(
            total,
            cached = skipped_cached,
            pending = pending.len(),
            "Planned enrichment run"
        );

        if pending.is_empty() {
            tracing::info!("All items already cached, nothing to enrich");
            return RunOutcome {
                summary: RunSummary {
                    total,
                    skipped_cached,
                    enriched: 0,
                    failed: 0,
                    elapsed_secs: started.elapsed().as_secs(),
                },
                cache,
            };
        }

        let batches = partition(pending, self.config.batch_size);
        let progress = batch_progress_bar(batches.len() as u64);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));

        let mut in_flight = FuturesUnordered::new();
        for (batch_index, batch) in batches.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let enricher = self.enricher.clone();
            in_flight.push(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let result = enricher.enrich(&batch).await;
                (batch_index, batch, result)
            });
        }

        let mut enriched = 0usize;
        let mut failed = 0usize;

        // Collect in completion order; positional integrity lives inside
        // each batch, not across batches.
        while let Some((batch_index, batch, result)) = in_flight.next().await {
            match result {
                Ok(records) => {
                    let mut checkpoint = CacheMap::new();
                    for (entry, record) in batch.iter().zip(records) {
                        match record {
                            // The cache holds the merged record so assembly
                            // is a plain keyed lookup.
                            Some(record) => match serde_json::to_value(&record) {
                                Ok(value) => {
                                    checkpoint.insert(entry.emoji.clone(), merge_record(entry, &value));
                                }
                                Err(err) => {
                                    tracing::warn!(
                                        emoji = %entry.emoji,
                                        error = %err,
                                        "Failed to serialize enrichment record"
                                    );
                                    failed += 1;
                                }
                            },
                            None => {
                                tracing::warn!(
                                    emoji = %entry.emoji,
                                    name = %entry.name,
                                    "Model returned invalid metadata for item"
                                );
                                failed += 1;
                            }
                        }
                    }

                    enriched += checkpoint.len();
                    if let Err(err) = self.store.merge_and_save(&checkpoint).await {
                        // The records stay in the session cache so the final
                        // artifact is still complete; only resumability of a
                        // later run is degraded.
                        tracing::warn!(
                            batch = batch_index,
                            error = %err,
                            "Failed to checkpoint batch to cache"
                        );
                    }
                    cache.extend(checkpoint);
                }
                Err(err) => {
                    tracing::warn!(
                        batch = batch_index,
                        items = batch.len(),
                        error = %err,
                        "Batch failed after retries"
                    );
                    failed += batch.len();
                    progress.set_message(format!("batch {batch_index} failed"));
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let summary = RunSummary {
            total,
            skipped_cached,
            enriched,
            failed,
            elapsed_secs: started.elapsed().as_secs(),
        };
        tracing::info!(
            total = summary.total,
            enriched = summary.enriched,
            failed = summary.failed,
            skipped_cached = summary.skipped_cached,
            elapsed_secs = summary.elapsed_secs,
            "Enrichment run complete"
        );

        RunOutcome { summary, cache }
    }
}

/// Progress bar over batches with elapsed time and ETA.
fn batch_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} batches ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-"),
    );
    pb
}
