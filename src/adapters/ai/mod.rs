//! AI provider adapters.
//!
//! Implementations of the [`crate::ports::AIProvider`] port: the Anthropic
//! API, OpenAI-compatible services, and a configurable mock for tests.

mod anthropic_provider;
mod mock_provider;
mod openai_provider;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider};
pub use mock_provider::{MockAIProvider, MockError};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
