//! OpenAI-compatible Provider - implementation of AIProvider for the
//! chat-completions wire format.
//!
//! Covers OpenAI itself plus the compatible services (Groq, OpenRouter,
//! DeepSeek, self-hosted gateways) which differ only in base URL. The system
//! prompt is injected as the leading `system` message.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::persona::ChatRole;
use crate::ports::{
    AIProvider, CompletionRequest, CompletionResponse, ProviderError, ProviderInfo, TokenUsage,
};

/// Configuration for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// API base URL (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Display name reported in provider info ("openai", "groq", ...).
    pub service_name: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            service_name: "openai".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the reported service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::InvalidRequest(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts our request to the chat-completions format, with the system
    /// prompt as the leading message.
    fn to_wire_request(&self, request: &CompletionRequest) -> WireRequest {
        let mut messages = vec![WireMessage {
            role: "system".to_string(),
            content: request.system_prompt.clone(),
        }];
        for msg in &request.messages {
            let role = match msg.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(WireMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            });
        }

        WireRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
        }
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ProviderError::AuthenticationFailed),
            429 => Err(ProviderError::rate_limited(60)),
            400 => Err(ProviderError::InvalidRequest(error_body)),
            500..=599 => Err(ProviderError::unavailable(format!(
                "server error {status}: {error_body}"
            ))),
            _ => Err(ProviderError::network(format!(
                "unexpected status {status}: {error_body}"
            ))),
        }
    }

    async fn parse_response(
        &self,
        response: Response,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = self.handle_response_status(response).await?;

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("response body: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::parse("response contained no choices"))?;

        // Some compatible gateways omit usage entirely.
        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let wire_request = self.to_wire_request(&request);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .header("Content-Type", "application/json")
            .json(&wire_request)
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
        ProviderInfo::new(self.config.service_name.clone(), self.config.model.clone())
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    model: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::persona::ChatMessage;

    #[test]
    fn system_prompt_leads_the_message_list() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("key")).unwrap();
        let request = CompletionRequest::new(
            "stay in character",
            vec![
                ChatMessage::user("Where were you?"),
                ChatMessage::assistant("In the tower."),
            ],
        );

        let wire = provider.to_wire_request(&request);
        assert_eq!(wire.messages.len(), 3);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[0].content, "stay in character");
        assert_eq!(wire.messages[1].role, "user");
        assert_eq!(wire.messages[2].role, "assistant");
    }

    #[test]
    fn config_builder_targets_compatible_services() {
        let config = OpenAIConfig::new("key")
            .with_base_url("https://api.groq.com/openai/v1")
            .with_service_name("groq")
            .with_model("llama-3.1-70b");

        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.service_name, "groq");
        assert_eq!(config.model, "llama-3.1-70b");
    }

    #[test]
    fn provider_info_reports_service_name() {
        let provider = OpenAIProvider::new(
            OpenAIConfig::new("key").with_service_name("openrouter"),
        )
        .unwrap();
        assert_eq!(provider.provider_info().name, "openrouter");
    }
}
