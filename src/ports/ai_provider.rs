//! AI Provider Port - interface to the text-generation capability.
//!
//! The pipeline treats generation as an opaque, possibly-failing dependency:
//! one system prompt plus a message history in, one text plus optional usage
//! counts out. Implementations connect to external services (Anthropic,
//! OpenAI-compatible APIs) and translate between the provider-specific wire
//! format and these types.
//!
//! Transport failures surface as [`ProviderError`] and abort the turn; they
//! are never retried by the refinement budget, which is reserved for policy
//! failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::persona::ChatMessage;

/// Port for text-generation providers.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a single completion. One blocking round trip; the pipeline
    /// suspends until it returns.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Provider identity (name, model).
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt guiding the model.
    pub system_prompt: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate, if the caller wants to cap it.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Creates a request with a system prompt and message history.
    pub fn new(system_prompt: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            max_tokens: None,
        }
    }

    /// Caps the number of generated tokens.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from one completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text.
    pub content: String,
    /// Token usage, absent for providers that do not report it.
    pub usage: Option<TokenUsage>,
    /// Model that generated the response.
    pub model: String,
}

/// Token usage counts for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Tokens in the completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Creates new usage counts.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens consumed.
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Provider identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "anthropic", "openai").
    pub name: String,
    /// Model identifier.
    pub model: String,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Transport-level provider failures.
///
/// Any of these aborts the turn that triggered the call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the provider's response.
    #[error("malformed provider response: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
