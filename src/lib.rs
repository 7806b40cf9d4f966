//! emoji-forge: LLM-backed emoji metadata enrichment.
//!
//! This library loads a categorized emoji catalog, enriches each emoji with
//! model-generated search metadata (keywords, emoticons, description, tags,
//! country code), caches results per glyph for resumable runs, and
//! assembles the final enriched dataset. A small search layer answers text
//! queries against the assembled dataset.

// Core modules
pub mod assemble;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod json_extract;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod store;

// Re-export commonly used error types
pub use assemble::AssembleError;
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use enrich::EnrichError;
pub use error::LlmError;
pub use search::SearchError;
pub use store::StoreError;
