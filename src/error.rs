//! Error types shared across emoji-forge subsystems.
//!
//! Module-specific errors (config, store, pipeline) live next to the code
//! that produces them; this module holds the LLM transport taxonomy used by
//! both the HTTP client and the enrichment retry logic.

use thiserror::Error;

/// Errors that can occur while talking to the model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

impl LlmError {
    /// Whether a failure of this kind is worth retrying.
    ///
    /// Transport failures (connection errors, timeouts), rate limits and any
    /// non-2xx status count as transient; parse failures indicate a
    /// formatting defect in the model output and do not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RequestFailed(_) | LlmError::RateLimited(_) | LlmError::ApiError { .. }
        )
    }
}
