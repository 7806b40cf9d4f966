//! HTTP client for OpenAI-compatible chat completion endpoints.
//!
//! One POST to `{base}/chat/completions` per call, bearer authentication,
//! non-streamed responses. Timeouts are set on the underlying client so that
//! a hung endpoint surfaces as a transport failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

use super::{GenerationRequest, GenerationResponse, LlmProvider, Message};

/// Client for OpenAI-compatible chat completion APIs.
pub struct ChatClient {
    /// Base URL for the API.
    api_base: String,
    /// API key for bearer authentication.
    api_key: String,
    /// HTTP client with the configured request timeout.
    http_client: Client,
}

impl ChatClient {
    /// Create a new client with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    /// * `api_key` - API key for authentication
    /// * `timeout` - Per-request deadline
    pub fn new(api_base: String, api_key: String, timeout: Duration) -> Self {
        Self {
            api_base,
            api_key,
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the API key masked for logging.
    pub fn api_key_masked(&self) -> String {
        if self.api_key.len() <= 8 {
            "*".repeat(self.api_key.len())
        } else {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        }
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    /// Always false: the pipeline consumes whole completions, never streams.
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
}

/// Internal choice structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

/// Internal message structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for ChatClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let api_request = ApiRequest {
            model: request.model,
            messages: request.messages,
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            // Try to parse as structured error
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(GenerationResponse {
            model: api_response.model,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_client_new() {
        let client = ChatClient::new(
            "http://localhost:4000".to_string(),
            "test-key".to_string(),
            Duration::from_secs(30),
        );

        assert_eq!(client.api_base(), "http://localhost:4000");
    }

    #[test]
    fn test_api_key_masked_short() {
        let client = ChatClient::new(
            "http://localhost".to_string(),
            "abc".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(client.api_key_masked(), "***");
    }

    #[test]
    fn test_api_key_masked_normal() {
        let client = ChatClient::new(
            "http://localhost".to_string(),
            "sk-1234567890abcdef".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(client.api_key_masked(), "sk-1...cdef");
    }

    #[test]
    fn test_api_request_serialization() {
        let request = ApiRequest {
            model: "test-model".to_string(),
            messages: vec![Message::user("hello")],
            stream: false,
            temperature: Some(0.2),
            max_tokens: None,
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"test-model\""));
        assert!(json.contains("\"stream\":false"));
        assert!(json.contains("\"temperature\":0.2"));
        assert!(!json.contains("max_tokens"));
    }

    #[tokio::test]
    async fn test_generate_connection_error() {
        // Port unlikely to have a listener; should surface as RequestFailed.
        let client = ChatClient::new(
            "http://localhost:65535".to_string(),
            "test-key".to_string(),
            Duration::from_secs(2),
        );

        let request = GenerationRequest::new("test-model", vec![Message::user("test")]);
        let result = client.generate(request).await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), LlmError::RequestFailed(_)));
    }
}
