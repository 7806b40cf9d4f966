//! Batch enrichment client.
//!
//! For each batch of emoji entries this module builds one prompt asking the
//! model for a strict JSON array of metadata objects, sends it through the
//! [`LlmProvider`] seam, and validates the response in two stages: first a
//! generic JSON parse, then per-element coercion into a typed
//! [`EnrichmentRecord`] with explicit per-field rules.
//!
//! Failure handling follows a fixed classification:
//! - transport failures, non-2xx statuses and empty responses are retried
//!   (whole-batch, fixed delay, bounded attempts);
//! - a response that is not a JSON array of exactly the batch's length is a
//!   structural model defect and fails the batch immediately;
//! - an element missing any required key marks only that item invalid.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::EmojiEntry;
use crate::error::LlmError;
use crate::json_extract::extract_json_array;
use crate::llm::{GenerationRequest, LlmProvider, Message};

/// Maximum keywords retained per record.
const MAX_KEYWORDS: usize = 10;

/// Maximum emoticons retained per record.
const MAX_EMOTICONS: usize = 5;

/// Maximum tags retained per record.
const MAX_TAGS: usize = 5;

/// The five keys every response element must carry.
const REQUIRED_KEYS: [&str; 5] = ["keywords", "emoticons", "description", "tags", "country_code"];

/// System prompt fixing the output contract.
const SYSTEM_PROMPT: &str =
    "You are an emoji metadata generator. Output ONLY a valid JSON array, with \
     no prose, no markdown fences, and no text before or after it.";

/// Errors that can occur while enriching one batch.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Transport or API failure from the model endpoint.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The endpoint answered but the completion content was empty.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The completion did not contain a parseable JSON array.
    #[error("Model response is not a JSON array")]
    NotAnArray,

    /// The array length does not match the batch size.
    #[error("Response array has {actual} elements, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl EnrichError {
    /// Whether the whole batch should be resubmitted for this failure.
    ///
    /// Structural defects (wrong shape, wrong length) are unlikely to
    /// self-correct and are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EnrichError::Llm(err) => err.is_transient(),
            EnrichError::EmptyResponse => true,
            EnrichError::NotAnArray | EnrichError::LengthMismatch { .. } => false,
        }
    }
}

/// Model-generated metadata for one emoji, after validation and normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentRecord {
    /// Search keywords, lowercase, at most 10.
    pub keywords: Vec<String>,
    /// Text emoticons (e.g. ":)", "<3"), at most 5, case preserved.
    pub emoticons: Vec<String>,
    /// Short semantic description; may be empty.
    pub description: String,
    /// Broad category tags, lowercase, at most 5.
    pub tags: Vec<String>,
    /// ISO 3166-1 alpha-2 code for flag emojis, uppercase, else `None`.
    pub country_code: Option<String>,
}

/// Builds the enrichment prompt for one batch.
///
/// The model is asked for exactly `batch.len()` objects in input order; the
/// response correlates by position, so the ordering instruction is part of
/// the contract, not a nicety.
pub fn build_prompt(batch: &[EmojiEntry]) -> String {
    let mut prompt = String::from("Analyze the following emojis:\n\n");
    for (i, entry) in batch.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. Emoji: {} Name: {}\n",
            i + 1,
            entry.emoji,
            entry.name
        ));
    }
    prompt.push_str(&format!(
        "\nGenerate a JSON array with exactly {} objects, one per emoji, in the \
         same order as listed above. Each object must contain ONLY these fields:\n\
         - keywords: list of relevant lowercase keywords or synonyms (max 10)\n\
         - emoticons: list of common text emoticons like \":)\", \"<3\", \":P\" (max 5, may be empty)\n\
         - description: short, neutral, semantic description of meaning or typical usage (1-2 sentences)\n\
         - tags: list of broad lowercase category tags (max 5, e.g. \"face\", \"emotion\", \"object\", \"animal\", \"food\", \"flag\", \"symbol\")\n\
         - country_code: 2-letter uppercase ISO 3166-1 alpha-2 country code if the emoji is a flag, otherwise null\n\
         \nOutput ONLY the JSON array. Do not include any other text before or after it.\n",
        batch.len()
    ));
    prompt
}

/// Validates and normalizes one response element.
///
/// Returns `None` when the element is not an object carrying all five
/// required keys. Field values are coerced rather than rejected: non-string
/// list entries are dropped, lists are truncated to their caps, and the
/// country code is kept only when it is exactly two characters.
pub fn validate_record(value: &serde_json::Value) -> Option<EnrichmentRecord> {
    let obj = value.as_object()?;
    if !REQUIRED_KEYS.iter().all(|key| obj.contains_key(*key)) {
        return None;
    }

    let description = match &obj["description"] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    let country_code = obj["country_code"].as_str().and_then(|code| {
        if code.chars().count() == 2 {
            Some(code.to_uppercase())
        } else {
            None
        }
    });

    Some(EnrichmentRecord {
        keywords: string_list(&obj["keywords"], MAX_KEYWORDS, true),
        emoticons: string_list(&obj["emoticons"], MAX_EMOTICONS, false),
        description,
        tags: string_list(&obj["tags"], MAX_TAGS, true),
        country_code,
    })
}

/// Keeps only string entries of a JSON array, optionally lowercased,
/// truncated to `cap`.
fn string_list(value: &serde_json::Value, cap: usize, lowercase: bool) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| {
                    if lowercase {
                        s.to_lowercase()
                    } else {
                        s.to_string()
                    }
                })
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}

/// Enriches batches of emoji entries through an LLM provider.
///
/// Holds the retry policy; persistence timing belongs to the orchestrator,
/// so this type never touches the cache store.
pub struct BatchEnricher {
    /// Provider used for generation.
    provider: Arc<dyn LlmProvider>,
    /// Model identifier sent with each request.
    model: String,
    /// Retries after the initial attempt for retryable failures.
    retry_attempts: u32,
    /// Fixed delay between attempts.
    retry_delay: Duration,
}

impl BatchEnricher {
    /// Creates a new enricher.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        retry_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            retry_attempts,
            retry_delay,
        }
    }

    /// Enriches one batch, retrying transient failures.
    ///
    /// On success the returned vector is aligned positionally with `batch`:
    /// `result[i]` is the record for `batch[i]`, or `None` when that element
    /// failed validation.
    ///
    /// # Errors
    ///
    /// Returns `EnrichError` once retries are exhausted or immediately for a
    /// structural failure; either way the whole batch is lost.
    pub async fn enrich(
        &self,
        batch: &[EmojiEntry],
    ) -> Result<Vec<Option<EnrichmentRecord>>, EnrichError> {
        let mut last_error = None;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
                tracing::debug!(attempt = attempt + 1, "Resubmitting batch");
            }

            match self.attempt(batch).await {
                Ok(records) => return Ok(records),
                Err(err) if err.is_retryable() && attempt < self.retry_attempts => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry_attempts + 1,
                        error = %err,
                        "Transient batch failure, will retry"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EnrichError::Llm(LlmError::RequestFailed(
                "Retries exhausted with no error captured".to_string(),
            ))
        }))
    }

    /// One request/parse/validate cycle, no retry.
    async fn attempt(
        &self,
        batch: &[EmojiEntry],
    ) -> Result<Vec<Option<EnrichmentRecord>>, EnrichError> {
        let request = GenerationRequest::new(
            &self.model,
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(build_prompt(batch)),
            ],
        )
        .with_temperature(0.2);

        let response = self.provider.generate(request).await?;
        let content = response.content().ok_or(EnrichError::EmptyResponse)?;

        let values = extract_json_array(content).ok_or(EnrichError::NotAnArray)?;
        if values.len() != batch.len() {
            return Err(EnrichError::LengthMismatch {
                expected: batch.len(),
                actual: values.len(),
            });
        }

        Ok(values.iter().map(validate_record).collect())
    }
}
