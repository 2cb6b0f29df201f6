//! AI provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key for the selected service
    pub api_key: Option<String>,

    /// Which inference service to call
    #[serde(default)]
    pub service: InferenceService,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Base URL override (for self-hosted or proxy deployments)
    pub base_url: Option<String>,
}

/// Supported inference services.
///
/// Everything except `Anthropic` speaks the OpenAI chat-completions wire
/// format and differs only in base URL.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InferenceService {
    #[default]
    Anthropic,
    OpenAi,
    Groq,
    OpenRouter,
    DeepSeek,
}

impl InferenceService {
    /// Default API base URL for this service.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            InferenceService::Anthropic => "https://api.anthropic.com",
            InferenceService::OpenAi => "https://api.openai.com/v1",
            InferenceService::Groq => "https://api.groq.com/openai/v1",
            InferenceService::OpenRouter => "https://openrouter.ai/api/v1",
            InferenceService::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// True if the service speaks the OpenAI-compatible wire format.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, InferenceService::Anthropic)
    }
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective base URL: explicit override, or the service default.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.service.default_base_url().to_string())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            return Err(ValidationError::MissingRequired("AI__API_KEY"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            service: InferenceService::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.service, InferenceService::Anthropic);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = AiConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("AI__API_KEY"))
        ));
    }

    #[test]
    fn test_base_url_override_wins() {
        let config = AiConfig {
            api_key: Some("key".to_string()),
            service: InferenceService::Groq,
            base_url: Some("http://localhost:11434/v1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_service_defaults_to_known_base_urls() {
        assert_eq!(
            InferenceService::Groq.default_base_url(),
            "https://api.groq.com/openai/v1"
        );
        assert!(InferenceService::Groq.is_openai_compatible());
        assert!(!InferenceService::Anthropic.is_openai_compatible());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AiConfig {
            timeout_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
