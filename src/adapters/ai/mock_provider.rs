//! Mock AI Provider for testing.
//!
//! Configurable implementation of the AIProvider port, allowing the pipeline
//! to run without calling real AI APIs.
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("I was in the tower.")
//!     .with_response("NONE!");
//!
//! let response = provider.complete(request).await?;
//! assert_eq!(response.content, "I was in the tower.");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{
    AIProvider, CompletionRequest, CompletionResponse, ProviderError, ProviderInfo, TokenUsage,
};

/// Mock AI provider for testing.
///
/// Returns pre-configured responses in order, records every request for
/// verification, and can inject errors.
#[derive(Debug, Clone, Default)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
enum MockResponse {
    /// Return a successful completion.
    Success {
        content: String,
        usage: Option<TokenUsage>,
    },
    /// Return an error.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate authentication failure.
    AuthenticationFailed,
    /// Simulate provider unavailable.
    Unavailable { message: String },
    /// Simulate network error.
    Network { message: String },
}

impl From<MockError> for ProviderError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => {
                ProviderError::rate_limited(retry_after_secs)
            }
            MockError::AuthenticationFailed => ProviderError::AuthenticationFailed,
            MockError::Unavailable { message } => ProviderError::unavailable(message),
            MockError::Network { message } => ProviderError::network(message),
        }
    }
}

impl MockAIProvider {
    /// Creates a new mock provider with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response with default usage counts.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_response_and_usage(content, Some(TokenUsage::new(10, 20)))
    }

    /// Queues a successful response with explicit (possibly absent) usage.
    pub fn with_response_and_usage(
        self,
        content: impl Into<String>,
        usage: Option<TokenUsage>,
    ) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockResponse::Success {
                content: content.into(),
                usage,
            });
        self
    }

    /// Queues an error response.
    pub fn with_error(self, error: MockError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockResponse::Error(error));
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded requests.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().unwrap().push(request);

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(MockResponse::Success { content, usage }) => Ok(CompletionResponse {
                content,
                usage,
                model: "mock-model".to_string(),
            }),
            Some(MockResponse::Error(err)) => Err(err.into()),
            None => Err(ProviderError::unavailable("mock response queue is empty")),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock-model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::persona::ChatMessage;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new("system", vec![ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let provider = MockAIProvider::new()
            .with_response("first")
            .with_response("second");

        assert_eq!(provider.complete(request("a")).await.unwrap().content, "first");
        assert_eq!(provider.complete(request("b")).await.unwrap().content, "second");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn errors_are_injected() {
        let provider = MockAIProvider::new().with_error(MockError::AuthenticationFailed);
        let err = provider.complete(request("a")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn exhausted_queue_reports_unavailable() {
        let provider = MockAIProvider::new();
        let err = provider.complete(request("a")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let provider = MockAIProvider::new().with_response("ok");
        provider.complete(request("hello")).await.unwrap();

        let calls = provider.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages[0].content, "hello");
    }

    #[tokio::test]
    async fn usage_can_be_absent() {
        let provider = MockAIProvider::new().with_response_and_usage("ok", None);
        let response = provider.complete(request("a")).await.unwrap();
        assert!(response.usage.is_none());
    }
}
