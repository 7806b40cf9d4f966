//! Final dataset assembly.
//!
//! The cache holds fully merged records (source fields overlaid with
//! enrichment fields). Assembly walks the flattened catalog in its
//! deterministic order, picks up each item's cached record, and writes the
//! collection as pretty-printed JSON. Items that never got a record are
//! absent from the output, not carried through raw. Assembly reads only the
//! session cache; it never talks to the model.

use std::path::Path;

use thiserror::Error;

use crate::catalog::EmojiEntry;
use crate::store::CacheMap;

/// Errors that can occur while writing the final dataset.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The output file could not be written.
    #[error("Failed to write dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The merged dataset could not be serialized.
    #[error("Failed to serialize dataset: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Merges one catalog entry with its enrichment record.
///
/// Source fields are laid down first, enrichment fields second, so on a key
/// collision the enrichment value wins.
pub fn merge_record(entry: &EmojiEntry, enrichment: &serde_json::Value) -> serde_json::Value {
    let mut merged = serde_json::Map::new();
    merged.insert("emoji".to_string(), entry.emoji.clone().into());
    merged.insert("name".to_string(), entry.name.clone().into());
    for (key, value) in &entry.extra {
        merged.insert(key.clone(), value.clone());
    }
    if let Some(fields) = enrichment.as_object() {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    serde_json::Value::Object(merged)
}

/// Builds the final dataset for `items` from the cache.
///
/// Cache values are already merged records, so this is a keyed lookup in
/// catalog order. Items without a record are skipped; completeness of the
/// output reflects how much enrichment succeeded.
pub fn build_dataset(items: &[EmojiEntry], cache: &CacheMap) -> Vec<serde_json::Value> {
    items
        .iter()
        .filter_map(|entry| cache.get(&entry.emoji).cloned())
        .collect()
}

/// Writes the final dataset to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns `AssembleError` when serialization or the write fails. A failed
/// final write is fatal to the run; the cache still holds the enrichment
/// work, so a rerun only needs to reassemble.
pub fn write_dataset(
    items: &[EmojiEntry],
    cache: &CacheMap,
    path: impl AsRef<Path>,
) -> Result<usize, AssembleError> {
    let dataset = build_dataset(items, cache);
    let json = serde_json::to_string_pretty(&dataset)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;

    tracing::info!(
        path = %path.display(),
        records = dataset.len(),
        "Wrote enriched dataset"
    );
    Ok(dataset.len())
}
