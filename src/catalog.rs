//! Source catalog loading and batch planning.
//!
//! The source dataset is a two-level grouping: category -> subcategory ->
//! list of emoji entries. The planner flattens that structure into one
//! deterministic sequence, drops anything already enriched in the cache,
//! and partitions the remainder into contiguous fixed-size batches.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the source catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Source file not found or unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One source emoji record.
///
/// `emoji` is the glyph and serves as the item's identity. All fields beyond
/// `emoji` and `name` are opaque and preserved verbatim through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmojiEntry {
    /// The emoji glyph; unique identifier for the item.
    pub emoji: String,
    /// Display name of the emoji.
    pub name: String,
    /// Any other original fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The nested source structure: category -> subcategory -> entries.
///
/// `BTreeMap` keeps the walk order stable across runs regardless of how the
/// file was produced.
pub type Catalog = BTreeMap<String, BTreeMap<String, Vec<EmojiEntry>>>;

/// Loads the source catalog from a JSON file.
///
/// # Errors
///
/// Returns `CatalogError` if the file is missing, unreadable, or not the
/// expected nested JSON shape. Both are fatal startup conditions.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    let catalog: Catalog = serde_json::from_str(&contents)?;
    Ok(catalog)
}

/// Flattens the nested catalog into one ordered sequence of items.
///
/// Entries missing a glyph or a name cannot be enriched or keyed and are
/// skipped with a warning.
pub fn flatten(catalog: &Catalog) -> Vec<EmojiEntry> {
    let mut items = Vec::new();
    for subcategories in catalog.values() {
        for entries in subcategories.values() {
            for entry in entries {
                if entry.emoji.is_empty() || entry.name.is_empty() {
                    tracing::warn!(
                        emoji = %entry.emoji,
                        name = %entry.name,
                        "Skipping entry with missing glyph or name"
                    );
                    continue;
                }
                items.push(entry.clone());
            }
        }
    }
    items
}

/// Removes items whose glyph already has a cache entry, preserving order.
pub fn filter_uncached(
    items: Vec<EmojiEntry>,
    cache: &HashMap<String, serde_json::Value>,
) -> Vec<EmojiEntry> {
    items
        .into_iter()
        .filter(|item| !cache.contains_key(&item.emoji))
        .collect()
}

/// Splits items into contiguous batches of at most `batch_size`.
///
/// The final batch is shorter when the item count is not a multiple of
/// `batch_size`. Order is preserved within and across batches; the model
/// response correlates positionally, so this matters end-to-end.
pub fn partition(items: Vec<EmojiEntry>, batch_size: usize) -> Vec<Vec<EmojiEntry>> {
    debug_assert!(batch_size >= 1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(emoji: &str, name: &str) -> EmojiEntry {
        EmojiEntry {
            emoji: emoji.to_string(),
            name: name.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn sample_catalog() -> Catalog {
        let json = serde_json::json!({
            "Smileys & Emotion": {
                "face-smiling": [
                    {"emoji": "😀", "name": "grinning face", "code": ["1F600"]},
                    {"emoji": "😃", "name": "grinning face with big eyes"}
                ],
                "face-affection": [
                    {"emoji": "🥰", "name": "smiling face with hearts"}
                ]
            },
            "Animals & Nature": {
                "animal-mammal": [
                    {"emoji": "🐶", "name": "dog face"}
                ]
            }
        });
        serde_json::from_value(json).expect("valid catalog")
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let err = load_catalog("/nonexistent/emojis.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[test]
    fn test_flatten_walks_all_groups() {
        let items = flatten(&sample_catalog());
        assert_eq!(items.len(), 4);
        // BTreeMap ordering: "Animals & Nature" before "Smileys & Emotion"
        assert_eq!(items[0].emoji, "🐶");
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let catalog = sample_catalog();
        assert_eq!(flatten(&catalog), flatten(&catalog));
    }

    #[test]
    fn test_flatten_preserves_extra_fields() {
        let items = flatten(&sample_catalog());
        let grinning = items.iter().find(|i| i.emoji == "😀").unwrap();
        assert_eq!(
            grinning.extra.get("code"),
            Some(&serde_json::json!(["1F600"]))
        );
    }

    #[test]
    fn test_flatten_skips_incomplete_entries() {
        let json = serde_json::json!({
            "cat": {
                "sub": [
                    {"emoji": "", "name": "nameless glyph"},
                    {"emoji": "😀", "name": ""},
                    {"emoji": "😃", "name": "kept"}
                ]
            }
        });
        let catalog: Catalog = serde_json::from_value(json).unwrap();
        let items = flatten(&catalog);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].emoji, "😃");
    }

    #[test]
    fn test_filter_uncached() {
        let items = vec![entry("😀", "a"), entry("😃", "b"), entry("🐶", "c")];
        let mut cache = HashMap::new();
        cache.insert("😃".to_string(), serde_json::json!({"name": "b"}));

        let remaining = filter_uncached(items, &cache);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|i| i.emoji != "😃"));
        // Order preserved
        assert_eq!(remaining[0].emoji, "😀");
        assert_eq!(remaining[1].emoji, "🐶");
    }

    #[test]
    fn test_partition_exact_multiple() {
        let items = (0..6).map(|i| entry(&format!("e{i}"), "x")).collect();
        let batches = partition(items, 3);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 3));
    }

    #[test]
    fn test_partition_remainder_batch_is_shorter() {
        // 23 items at batch size 10 -> batches of 10, 10, 3.
        let items = (0..23).map(|i| entry(&format!("e{i}"), "x")).collect();
        let batches = partition(items, 10);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[1].len(), 10);
        assert_eq!(batches[2].len(), 3);
        // Contiguity preserved
        assert_eq!(batches[2][0].emoji, "e20");
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_partition_batch_size_one() {
        let items = vec![entry("😀", "a"), entry("😃", "b")];
        let batches = partition(items, 1);
        assert_eq!(batches.len(), 2);
    }
}
