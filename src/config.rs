//! Pipeline configuration for the enrichment run.
//!
//! Configuration is sourced from environment variables (with `.env` support
//! in the binary), validated once at startup, and then treated as immutable
//! for the lifetime of the run.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Endpoint settings
    /// Base URL of the OpenAI-compatible model endpoint.
    pub api_base: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// API credential. Required; missing credential is a fatal startup error.
    pub api_key: String,

    // Batching settings
    /// Number of items packed into a single enrichment request.
    pub batch_size: usize,
    /// Maximum number of in-flight enrichment requests.
    pub max_concurrent: usize,

    // Retry settings
    /// Per-request timeout. Exceeding it counts as a transient failure.
    pub request_timeout: Duration,
    /// Number of retries after the initial attempt for transient failures.
    pub retry_attempts: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key: String::new(),
            batch_size: 10,
            max_concurrent: 4,
            request_timeout: Duration::from_secs(60),
            retry_attempts: 2,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl PipelineConfig {
    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EMOJI_FORGE_API_BASE`: model endpoint base URL (default: OpenRouter)
    /// - `EMOJI_FORGE_MODEL`: model identifier (default: openai/gpt-4o-mini)
    /// - `EMOJI_FORGE_API_KEY`: API credential (required)
    /// - `EMOJI_FORGE_BATCH_SIZE`: items per request (default: 10)
    /// - `EMOJI_FORGE_MAX_CONCURRENT`: in-flight requests (default: 4)
    /// - `EMOJI_FORGE_TIMEOUT_SECS`: per-request timeout (default: 60)
    /// - `EMOJI_FORGE_RETRY_ATTEMPTS`: retries per batch (default: 2)
    /// - `EMOJI_FORGE_RETRY_DELAY_SECS`: delay between retries (default: 5)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API key is absent or any variable fails
    /// to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::overrides_from_env()?;
        if config.api_key.is_empty() {
            return Err(ConfigError::MissingEnvVar("EMOJI_FORGE_API_KEY".to_string()));
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads every `EMOJI_FORGE_*` variable without requiring the
    /// credential. Callers that accept the key from another source merge it
    /// in and validate afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a set variable fails to
    /// parse.
    pub fn overrides_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("EMOJI_FORGE_API_BASE") {
            config.api_base = val;
        }

        if let Ok(val) = std::env::var("EMOJI_FORGE_MODEL") {
            config.model = val;
        }

        config.api_key = std::env::var("EMOJI_FORGE_API_KEY").unwrap_or_default();

        if let Ok(val) = std::env::var("EMOJI_FORGE_BATCH_SIZE") {
            config.batch_size = parse_env_value(&val, "EMOJI_FORGE_BATCH_SIZE")?;
        }

        if let Ok(val) = std::env::var("EMOJI_FORGE_MAX_CONCURRENT") {
            config.max_concurrent = parse_env_value(&val, "EMOJI_FORGE_MAX_CONCURRENT")?;
        }

        if let Ok(val) = std::env::var("EMOJI_FORGE_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "EMOJI_FORGE_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("EMOJI_FORGE_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_env_value(&val, "EMOJI_FORGE_RETRY_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("EMOJI_FORGE_RETRY_DELAY_SECS") {
            let secs: u64 = parse_env_value(&val, "EMOJI_FORGE_RETRY_DELAY_SECS")?;
            config.retry_delay = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_key cannot be empty".to_string(),
            ));
        }

        if self.api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses an environment variable value with a descriptive error on failure.
fn parse_env_value<T: std::str::FromStr>(val: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    val.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
