//! LLM access layer: message types, the provider seam, and the HTTP client.
//!
//! The enrichment client only depends on the [`LlmProvider`] trait, so tests
//! can substitute a scripted provider without any network access.

mod client;

pub use client::ChatClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "system", "user").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for text generation from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier to use for generation.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature. Lower values keep the output format stable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from an LLM generation request.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Model that produced this response.
    pub model: String,
    /// Generated completion text. Empty when the endpoint returned no choices.
    pub content: String,
}

impl GenerationResponse {
    /// The completion content, or `None` when the model returned nothing.
    pub fn content(&self) -> Option<&str> {
        if self.content.is_empty() {
            None
        } else {
            Some(&self.content)
        }
    }
}

/// Trait for LLM providers that can generate text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let system = Message::system("Output only JSON.");
        assert_eq!(system.role, "system");
        assert_eq!(system.content, "Output only JSON.");

        let user = Message::user("Describe 😀");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "Describe 😀");
    }

    #[test]
    fn test_generation_request_builder() {
        let request = GenerationRequest::new("test-model", vec![Message::user("hi")])
            .with_temperature(0.2)
            .with_max_tokens(512);

        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn test_generation_response_content() {
        let response = GenerationResponse {
            model: "test-model".to_string(),
            content: "[]".to_string(),
        };
        assert_eq!(response.content(), Some("[]"));

        let empty = GenerationResponse {
            model: "test-model".to_string(),
            content: String::new(),
        };
        assert_eq!(empty.content(), None);
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = GenerationRequest::new("m", vec![Message::user("x")]);
        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
