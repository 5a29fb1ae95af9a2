//! Provider implementations for Relay.
//!
//! This crate provides concrete implementations of the `Provider` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and development
//! - **OpenAI**: GPT models (API key required)
//! - **Gemini**: Google's Gemini models (API key required)
//! - **Perplexity**: Web-grounded Sonar models (API key required)

pub mod factory;
pub mod gemini;
pub mod openai;
pub mod perplexity;

use async_trait::async_trait;
use relay_abstraction::{
    ChatMessage, Provider, ProviderError, ProviderKind, ProviderResponse, ProviderUsage,
};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

pub use factory::{ProviderConfig, ProviderFactory, ProviderRegistry};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use perplexity::PerplexityProvider;

/// A mock implementation of the `Provider` trait for testing and demonstration.
#[derive(Debug, Default)]
pub struct MockProvider {
    kind: Option<ProviderKind>,
    model_id: String,
    canned_response: Option<String>,
    usage: Option<ProviderUsage>,
    failure: Option<ProviderError>,
    /// Number of leading calls that fail before succeeding (when a failure is set).
    fail_first: Option<u32>,
    calls: AtomicU32,
}

impl MockProvider {
    /// Creates a new `MockProvider` reporting the given identity.
    #[must_use]
    pub fn new(kind: ProviderKind, model_id: String) -> Self {
        Self { kind: Some(kind), model_id, ..Self::default() }
    }

    /// Sets a canned response returned on every invocation.
    #[must_use]
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.canned_response = Some(content.into());
        self
    }

    /// Sets self-reported token usage on every response.
    #[must_use]
    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = Some(ProviderUsage { input_tokens, output_tokens });
        self
    }

    /// Makes every invocation fail with the given error.
    #[must_use]
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self.fail_first = None;
        self
    }

    /// Makes the first `n` invocations fail with the given error, then succeed.
    #[must_use]
    pub fn fail_first(mut self, n: u32, error: ProviderError) -> Self {
        self.failure = Some(error);
        self.fail_first = Some(n);
        self
    }

    /// Number of invocations observed so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            call = call,
            "MockProvider invoked"
        );

        if let Some(ref error) = self.failure {
            let should_fail = self.fail_first.is_none_or(|n| call < n);
            if should_fail {
                return Err(error.clone());
            }
        }

        let content = self.canned_response.clone().unwrap_or_else(|| {
            let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            format!("Mock response to: {}", prompt)
        });

        Ok(ProviderResponse {
            provider: self.provider(),
            model_id: self.model_id.clone(),
            content,
            usage: self.usage,
        })
    }

    fn provider(&self) -> ProviderKind {
        self.kind.unwrap_or(ProviderKind::OpenAi)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_prompt() {
        let provider = MockProvider::new(ProviderKind::Gemini, "gemini-2.0-flash".to_string());
        let response = provider.invoke(&[ChatMessage::user("ping")]).await.unwrap();
        assert_eq!(response.provider, ProviderKind::Gemini);
        assert_eq!(response.model_id, "gemini-2.0-flash");
        assert_eq!(response.content, "Mock response to: ping");
        assert!(response.usage.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_canned_response_and_usage() {
        let provider = MockProvider::new(ProviderKind::OpenAi, "gpt-4o".to_string())
            .with_response("canned")
            .with_usage(100, 50);
        let response = provider.invoke(&[ChatMessage::user("anything")]).await.unwrap();
        assert_eq!(response.content, "canned");
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 50);
    }

    #[tokio::test]
    async fn test_mock_fail_first_then_succeeds() {
        let provider = MockProvider::new(ProviderKind::OpenAi, "gpt-4o".to_string()).fail_first(
            2,
            ProviderError::RateLimited { provider: "openai".to_string(), message: None },
        );

        let messages = [ChatMessage::user("retry me")];
        assert!(provider.invoke(&messages).await.is_err());
        assert!(provider.invoke(&messages).await.is_err());
        assert!(provider.invoke(&messages).await.is_ok());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_always_failing() {
        let provider = MockProvider::new(ProviderKind::OpenAi, "gpt-4o".to_string())
            .failing(ProviderError::ResponseError("boom".to_string()));
        for _ in 0..3 {
            assert!(provider.invoke(&[ChatMessage::user("x")]).await.is_err());
        }
    }
}
