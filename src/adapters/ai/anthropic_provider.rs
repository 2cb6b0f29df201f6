//! Anthropic Provider - implementation of AIProvider for the Claude API.
//!
//! Non-streaming only: the pipeline evaluates whole drafts, so there is
//! nothing to stream.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(api_key)
//!     .with_model("claude-sonnet-4-20250514")
//!     .with_base_url("https://api.anthropic.com");
//!
//! let provider = AnthropicProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::persona::ChatRole;
use crate::ports::{
    AIProvider, CompletionRequest, CompletionResponse, ProviderError, ProviderInfo, TokenUsage,
};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Anthropic API provider implementation.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::InvalidRequest(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Builds the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Converts our request to Anthropic's format.
    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let messages = request
            .messages
            .iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    // The system prompt travels in its own field.
                    ChatRole::System => return None,
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                Some(AnthropicMessage {
                    role: role.to_string(),
                    content: msg.content.clone(),
                })
            })
            .collect();

        AnthropicRequest {
            model: self.config.model.clone(),
            messages,
            system: request.system_prompt.clone(),
            max_tokens: request.max_tokens.unwrap_or(1024),
        }
    }

    /// Maps a failed response status to a provider error.
    async fn handle_response_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ProviderError::AuthenticationFailed),
            429 => Err(ProviderError::rate_limited(parse_retry_after(&error_body))),
            400 => Err(ProviderError::InvalidRequest(error_body)),
            500..=599 => Err(ProviderError::unavailable(format!(
                "server error {status}: {error_body}"
            ))),
            _ => Err(ProviderError::network(format!(
                "unexpected status {status}: {error_body}"
            ))),
        }
    }

    /// Parses a successful response body.
    async fn parse_response(
        &self,
        response: Response,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = self.handle_response_status(response).await?;

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("response body: {e}")))?;

        let content = body
            .content
            .into_iter()
            .filter_map(|block| (block.block_type == "text").then_some(block.text).flatten())
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            usage: Some(TokenUsage::new(
                body.usage.input_tokens,
                body.usage.output_tokens,
            )),
            model: body.model,
        })
    }
}

/// Best-effort extraction of a retry hint from the error body.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(s) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = s.find("try again in ") {
                let rest = &s[idx + 13..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse::<u32>() {
                    return secs;
                }
            }
        }
    }
    60
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let anthropic_request = self.to_anthropic_request(&request);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {e}"))
                } else {
                    ProviderError::network(e.to_string())
                }
            })?;

        self.parse_response(response).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("anthropic", self.config.model.clone())
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    system: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::persona::ChatMessage;

    #[test]
    fn config_builder_works() {
        let config = AnthropicConfig::new("key")
            .with_model("claude-3-haiku-20240307")
            .with_base_url("http://localhost:9000")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn system_messages_are_excluded_from_message_list() {
        let provider = AnthropicProvider::new(AnthropicConfig::new("key")).unwrap();
        let request = CompletionRequest::new(
            "system prompt",
            vec![
                ChatMessage::new(ChatRole::System, "ignored"),
                ChatMessage::user("hello"),
            ],
        );

        let wire = provider.to_anthropic_request(&request);
        assert_eq!(wire.messages.len(), 1);
        assert_eq!(wire.messages[0].role, "user");
        assert_eq!(wire.system, "system prompt");
    }

    #[test]
    fn retry_after_parsed_from_error_message() {
        let body = r#"{"error": {"message": "rate limited, try again in 42s"}}"#;
        assert_eq!(parse_retry_after(body), 42);
    }

    #[test]
    fn retry_after_defaults_when_unparseable() {
        assert_eq!(parse_retry_after("not json"), 60);
    }

    #[test]
    fn provider_info_reports_model() {
        let provider = AnthropicProvider::new(AnthropicConfig::new("key")).unwrap();
        let info = provider.provider_info();
        assert_eq!(info.name, "anthropic");
        assert_eq!(info.model, "claude-sonnet-4-20250514");
    }
}
