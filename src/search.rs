//! Search over an enriched dataset.
//!
//! Loads the assembled dataset and answers text queries with a two-tier
//! scoring scheme: country-code, tag, name, and keyword matches rank high;
//! exact emoticon matches rank low. A fixed override table maps the most
//! common text emoticons straight to their conventional emojis, bypassing
//! scoring entirely, because model-generated emoticon lists are too noisy
//! for those to rank well on their own.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a dataset for search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The dataset file could not be read.
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset file is not a JSON array of emoji records.
    #[error("Failed to parse dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// One record of the assembled dataset.
///
/// Enrichment fields default to empty so datasets containing unenriched
/// entries still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedEmoji {
    pub emoji: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub emoticons: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    /// Source fields carried through assembly (codepoints, category, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Conventional emoticon-to-emoji mappings, checked before scoring.
///
/// Keys are matched lowercase; several eyeless variants (")", "d", "p") are
/// included because chat input often drops the colon.
const COMMON_EMOTICON_TARGETS: &[(&str, &[&str])] = &[
    (":)", &["😊", "😄", "🙂", "🥰", "🤗", "😁"]),
    (":-)", &["😊", "😄", "🙂", "🥰", "🤗", "😁"]),
    ("=)", &["😊", "😄", "🙂", "🥰", "🤗", "😁"]),
    (")", &["😊", "😄", "🙂", "🥰", "🤗", "😁"]),
    (":d", &["😀", "😃", "😂", "🤣", "😆", "😁", "😄"]),
    (":-d", &["😀", "😃", "😂", "🤣", "😆", "😁", "😄"]),
    ("=d", &["😀", "😃", "😂", "🤣", "😆", "😁", "😄"]),
    ("d", &["😀", "😃", "😂", "🤣", "😆", "😁", "😄"]),
    (":p", &["😋", "😛", "😜", "🤪"]),
    (":-p", &["😋", "😛", "😜", "🤪"]),
    ("=p", &["😋", "😛", "😜", "🤪"]),
    ("p", &["😋", "😛", "😜", "🤪"]),
    (":(", &["😞", "😟", "😢", "😥", "🙁", "🥺", "😔"]),
    (":-(", &["😞", "😟", "😢", "😥", "🙁", "🥺", "😔"]),
    ("=(", &["😞", "😟", "😢", "😥", "🙁", "🥺", "😔"]),
    ("(", &["😞", "😟", "😢", "😥", "🙁", "🥺", "😔"]),
    (":o", &["😮", "😯", "😲", "😳", "😱"]),
    (":-o", &["😮", "😯", "😲", "😳", "😱"]),
    ("o", &["😮", "😯", "😲", "😳", "😱"]),
    (":|", &["😐", "😑", "😶"]),
    (":-|", &["😐", "😑", "😶"]),
    ("=|", &["😐", "😑", "😶"]),
    ("|", &["😐", "😑", "😶"]),
    (";)", &["😉", "😊", "🥰", "😘", "🤗"]),
    (";-)", &["😉", "😊", "🥰", "😘", "🤗"]),
    (";", &["😉", "😊", "🥰", "😘", "🤗"]),
    (":/", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    (":-/", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    ("/", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    (":\\", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    (":-\\", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    ("\\", &["😕", "🤔", "🤨", "🧐", "🫤", "🤷", "🙄"]),
    ("<3", &["❤️", "🧡", "💛", "💚", "💙", "💜", "🤎", "🖤", "🤍", "💖", "💕"]),
    ("</3", &["💔"]),
    (":*", &["😗", "😙", "😚", "😘"]),
    (":-*", &["😗", "😙", "😚", "😘"]),
    (":$", &["😳", "🫣", "😊", "😅"]),
    (":-$", &["😳", "🫣", "😊", "😅"]),
    ("b)", &["😎"]),
    ("b-)", &["😎"]),
    ("8)", &["😎"]),
    ("8-)", &["😎"]),
    ("^_^", &["😊"]),
    ("^^", &["😊"]),
    (">:(", &["😠", "😡", "😤"]),
    (">:-(", &["😡", "😤"]),
    (":'(", &["😢", "😭", "😥"]),
];

const HIGH_SCORE: u8 = 2;
const LOW_SCORE: u8 = 1;

/// In-memory search index over an enriched dataset.
pub struct SearchIndex {
    emojis: Vec<EnrichedEmoji>,
    /// Lowercased emoticon -> indexes into `emojis`, in the table's order.
    /// Targets absent from the dataset are dropped at build time.
    common_overrides: HashMap<String, Vec<usize>>,
}

impl SearchIndex {
    /// Builds an index over an in-memory dataset.
    pub fn new(emojis: Vec<EnrichedEmoji>) -> Self {
        let glyph_to_index: HashMap<&str, usize> = emojis
            .iter()
            .enumerate()
            .map(|(i, e)| (e.emoji.as_str(), i))
            .collect();

        let mut common_overrides = HashMap::new();
        for (emoticon, targets) in COMMON_EMOTICON_TARGETS {
            let indexes: Vec<usize> = targets
                .iter()
                .filter_map(|glyph| glyph_to_index.get(glyph).copied())
                .collect();
            if !indexes.is_empty() {
                common_overrides.insert(emoticon.to_lowercase(), indexes);
            }
        }

        Self {
            emojis,
            common_overrides,
        }
    }

    /// Loads the assembled dataset from `path` and builds an index.
    ///
    /// # Errors
    ///
    /// Returns `SearchError` when the file is unreadable or not a JSON array
    /// of emoji records.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path)?;
        let emojis: Vec<EnrichedEmoji> = serde_json::from_str(&content)?;
        tracing::debug!(records = emojis.len(), "Loaded dataset for search");
        Ok(Self::new(emojis))
    }

    /// Number of records in the index.
    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }

    /// Searches the dataset, returning at most `max_results` records.
    ///
    /// Query matching is case-insensitive. Common-emoticon overrides are
    /// checked first, both verbatim and with a ":" prefix so "p" finds the
    /// ":p" family. Otherwise records score high for a country-code match
    /// (queries up to 3 characters), an exact tag match, or a substring
    /// match in name or keywords, and low for an exact emoticon match.
    pub fn search(&self, query: &str, max_results: usize) -> Vec<&EnrichedEmoji> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || self.emojis.is_empty() {
            return Vec::new();
        }

        if let Some(indexes) = self
            .common_overrides
            .get(&query)
            .or_else(|| self.common_overrides.get(&format!(":{query}")))
        {
            return indexes
                .iter()
                .take(max_results)
                .map(|&i| &self.emojis[i])
                .collect();
        }

        let mut scored: Vec<(&EnrichedEmoji, u8)> = Vec::new();
        for emoji in &self.emojis {
            let score = self.score(emoji, &query);
            if score > 0 {
                scored.push((emoji, score));
            }
        }

        // Stable sort keeps dataset order within a score tier.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored
            .into_iter()
            .take(max_results)
            .map(|(emoji, _)| emoji)
            .collect()
    }

    fn score(&self, emoji: &EnrichedEmoji, query: &str) -> u8 {
        let mut score = 0;

        if query.chars().count() <= 3 {
            if let Some(code) = &emoji.country_code {
                if code.eq_ignore_ascii_case(query) {
                    score = score.max(HIGH_SCORE);
                }
            }
        }
        if emoji.tags.iter().any(|tag| tag == query) {
            score = score.max(HIGH_SCORE);
        }
        if emoji.name.to_lowercase().contains(query) {
            score = score.max(HIGH_SCORE);
        }
        if emoji.keywords.iter().any(|kw| kw.contains(query)) {
            score = score.max(HIGH_SCORE);
        }
        if emoji
            .emoticons
            .iter()
            .any(|emoticon| emoticon.to_lowercase() == query)
        {
            score = score.max(LOW_SCORE);
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        emoji: &str,
        name: &str,
        keywords: &[&str],
        emoticons: &[&str],
        tags: &[&str],
        country_code: Option<&str>,
    ) -> EnrichedEmoji {
        EnrichedEmoji {
            emoji: emoji.to_string(),
            name: name.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            emoticons: emoticons.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            country_code: country_code.map(|s| s.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    fn fixture() -> SearchIndex {
        SearchIndex::new(vec![
            record(
                "😊",
                "smiling face with smiling eyes",
                &["happy", "smile", "warm"],
                &[":)"],
                &["face", "emotion"],
                None,
            ),
            record(
                "🤐",
                "zipper-mouth face",
                &["secret", "quiet", "silence"],
                &[],
                &["face"],
                None,
            ),
            record(
                "🇬🇧",
                "flag: united kingdom",
                &["flag", "britain", "uk"],
                &[],
                &["flag", "country"],
                Some("GB"),
            ),
            record(
                "🚢",
                "ship",
                &["ship", "boat", "vessel"],
                &[],
                &["transport"],
                None,
            ),
            record(
                "😼",
                "cat with wry smile",
                &["cat", "smirk"],
                &[],
                &["cat", "animal"],
                None,
            ),
            record(
                "🎌",
                "crossed flags",
                &["flags", "celebration"],
                &["xf"],
                &["flag"],
                None,
            ),
        ])
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = fixture();
        assert!(index.search("", 10).is_empty());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_common_emoticon_override() {
        let index = fixture();
        let results = index.search(":)", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].emoji, "😊");

        // Eyeless variant resolves through the same table.
        let eyeless = index.search(")", 10);
        assert_eq!(eyeless[0].emoji, "😊");
    }

    #[test]
    fn test_colon_prefix_fallback() {
        let index = fixture();
        // "$" appears in the table only as ":$"; the prefixed lookup
        // resolves it to the blushing faces present in the fixture.
        let results = index.search("$", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].emoji, "😊");
    }

    #[test]
    fn test_country_code_match_is_case_insensitive() {
        let index = fixture();
        for query in ["gb", "GB", "Gb"] {
            let results = index.search(query, 10);
            assert!(
                results.iter().any(|e| e.emoji == "🇬🇧"),
                "query {query:?} should find the UK flag"
            );
        }
    }

    #[test]
    fn test_country_code_ignored_for_long_queries() {
        let index = fixture();
        // 4+ character queries never match on country code alone.
        let results = index.search("gbgb", 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_exact_tag_match() {
        let index = fixture();
        let results = index.search("cat", 10);
        assert!(results.iter().any(|e| e.emoji == "😼"));
    }

    #[test]
    fn test_partial_name_match() {
        let index = fixture();
        let results = index.search("kingdom", 10);
        assert!(results.iter().any(|e| e.emoji == "🇬🇧"));
        assert_eq!(index.search("KINGDOM", 10).len(), results.len());
    }

    #[test]
    fn test_partial_keyword_match() {
        let index = fixture();
        let results = index.search("secret", 10);
        assert!(results.iter().any(|e| e.emoji == "🤐"));

        let ship = index.search("ship", 10);
        assert!(ship.iter().any(|e| e.emoji == "🚢"));
    }

    #[test]
    fn test_emoticon_match_ranks_below_high_matches() {
        let mut emojis = fixture().emojis;
        // A record whose only hit for "xf" is an emoticon, plus one whose
        // name contains it.
        emojis.push(record("🧪", "xf test tube", &[], &[], &[], None));
        let index = SearchIndex::new(emojis);

        let results = index.search("xf", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].emoji, "🧪");
        assert_eq!(results[1].emoji, "🎌");
    }

    #[test]
    fn test_max_results_cap() {
        let index = fixture();
        let all = index.search("flag", 10);
        assert!(all.len() >= 2);

        let limited = index.search("flag", 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_nonsense_query_finds_nothing() {
        let index = fixture();
        assert!(index.search("qwertyuiopasdfghjkl", 10).is_empty());
    }

    #[test]
    fn test_deserializes_unenriched_records() {
        let json = r#"[{"emoji": "😀", "name": "grinning face", "category": "Smileys"}]"#;
        let emojis: Vec<EnrichedEmoji> = serde_json::from_str(json).unwrap();
        assert_eq!(emojis[0].emoji, "😀");
        assert!(emojis[0].keywords.is_empty());
        assert_eq!(emojis[0].extra["category"], "Smileys");
    }
}
