//! Provider abstraction layer for Relay.
//!
//! This crate defines the capability trait every LLM provider family
//! implements, plus the shared vocabulary (provider kinds, task types,
//! complexity tiers) used by routing and telemetry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents an error that can occur when invoking an LLM provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// An error occurred during the API request (e.g., network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The provider returned an error response (e.g., invalid input, malformed payload).
    #[error("Provider Response Error: {0}")]
    ResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The provider is not supported or not configured.
    #[error("Unsupported Provider: {0}")]
    UnsupportedProvider(String),

    /// Provider rate limit or quota hit (transient, eligible for retry).
    #[error("Provider '{provider}' rate limited{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    RateLimited {
        /// The provider name (e.g., "openai", "gemini").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The invocation exceeded its deadline.
    #[error("Provider '{provider}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// The provider name.
        provider: String,
        /// Elapsed time before the deadline fired.
        elapsed_ms: u64,
    },

    /// The invocation was cancelled by the caller.
    #[error("Invocation cancelled")]
    Cancelled,

    /// Other unexpected errors.
    #[error("Other Provider Error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether the error is transient and eligible for a bounded retry.
    ///
    /// Rate limits, deadlines, and network-level request failures are
    /// retryable; everything else propagates immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::RequestError(_)
        )
    }
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    /// Creates a system-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
}

/// Provider family identity, carried on every tagged response and usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI GPT family (deep-capability provider).
    OpenAi,
    /// Google Gemini family (fast/economical alternate provider).
    Gemini,
    /// Perplexity family (web-grounded provider).
    Perplexity,
    /// Composed multi-call pipeline output, not a single vendor.
    Orchestrated,
}

impl ProviderKind {
    /// Stable string form used in telemetry and serialized records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
            Self::Orchestrated => "orchestrated",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "perplexity" => Ok(Self::Perplexity),
            "orchestrated" => Ok(Self::Orchestrated),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Coarse classification of what the caller wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Open-ended information gathering.
    Research,
    /// Analysis of a specific company or market.
    CompanyAnalysis,
    /// Prospect/lead list building and outreach prep.
    LeadGeneration,
    /// Ideal-customer-profile development.
    IcpDevelopment,
    /// Condensing existing text.
    Summarization,
    /// Conversational back-and-forth.
    SimpleChat,
    /// Latency-sensitive short answers.
    FastResponse,
}

impl TaskType {
    /// Stable kebab-case string form used in telemetry records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::CompanyAnalysis => "company-analysis",
            Self::LeadGeneration => "lead-generation",
            Self::IcpDevelopment => "icp-development",
            Self::Summarization => "summarization",
            Self::SimpleChat => "simple-chat",
            Self::FastResponse => "fast-response",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse estimate of how much reasoning/context a query needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Short, shallow queries.
    Low,
    /// The default middle ground.
    Medium,
    /// Long, multi-part, or depth-keyword queries.
    High,
}

impl Complexity {
    /// Stable lowercase string form used in telemetry records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage self-reported by a provider for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    /// Number of tokens in the prompt.
    pub input_tokens: u32,
    /// Number of tokens in the completion.
    pub output_tokens: u32,
}

/// The tagged result of a provider invocation.
///
/// Providers self-report their `(provider, model_id)` identity alongside the
/// content so callers never infer identity from the concrete instance type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The provider family that produced this response.
    pub provider: ProviderKind,
    /// The concrete model id that produced this response.
    pub model_id: String,
    /// The generated content.
    pub content: String,
    /// Usage statistics, when the provider reports them.
    pub usage: Option<ProviderUsage>,
}

/// The capability every LLM provider family implements.
///
/// All providers must be `Send + Sync` to allow concurrent use across tasks.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Invokes the provider with a conversation and returns its tagged response.
    ///
    /// # Arguments
    /// * `messages` - The conversation as a slice of chat messages
    ///
    /// # Errors
    /// Returns a `ProviderError` if the invocation fails.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ProviderResponse, ProviderError>;

    /// Returns the provider family identity.
    fn provider(&self) -> ProviderKind;

    /// Returns the concrete model id this handle targets.
    fn model_id(&self) -> &str;
}
