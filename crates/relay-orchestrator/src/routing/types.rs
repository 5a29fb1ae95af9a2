//! Types for the model routing system.

use chrono::{DateTime, Utc};
use relay_abstraction::{Complexity, ProviderKind, TaskType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Caller intent hint, narrower than a task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    /// Conversational exchange.
    Chat,
    /// Analytical reasoning over the material.
    Analysis,
    /// Depth over speed.
    DeepInfo,
    /// Facts about a specific company.
    CompanyInfo,
    /// Open-ended information gathering.
    Research,
    /// Condensing existing text.
    Summarization,
}

impl Intent {
    /// Stable kebab-case string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Analysis => "analysis",
            Self::DeepInfo => "deep-info",
            Self::CompanyInfo => "company-info",
            Self::Research => "research",
            Self::Summarization => "summarization",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-handling posture requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    /// No special constraint.
    #[default]
    Standard,
    /// Route to the privacy-preferred provider family.
    Private,
}

/// Per-call routing options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Pin the deep-capability (OpenAI) family. Highest routing priority.
    pub force_gpt: bool,
    /// Pin the alternate (Gemini) family. Loses only to `force_gpt`;
    /// used by provider-comparison mode.
    pub force_alternate: bool,
    /// Data-handling posture.
    pub privacy_level: PrivacyLevel,
    /// Route to the web-grounded provider.
    pub requires_web_search: bool,
    /// Caller intent hint.
    pub intent: Option<Intent>,
    /// Treat ICP-development work as deep rather than fast-lane.
    pub deep: bool,
    /// Whether retrieval-augmented context backs this call.
    pub rag_used: bool,
    /// Conversation correlation id carried into telemetry.
    pub chat_id: Option<String>,
    /// End-user id carried into telemetry.
    pub user_id: Option<String>,
}

/// The transient outcome of evaluating the routing table for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    /// Selected provider family.
    pub provider: ProviderKind,
    /// Selected model id.
    pub model: String,
    /// Name of the rule that fired, for explainability.
    pub rule: &'static str,
}

/// Token/cost/latency accounting for one tracked call.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUsage {
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Tokens in the completion.
    pub output_tokens: u32,
    /// Derived: input + output.
    pub total_tokens: u32,
    /// Derived cost.
    pub cost: f64,
    /// Wall-clock latency.
    pub response_time_ms: u64,
}

/// Identity and classification of one tracked call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetadata {
    /// Provider family that served the call (self-reported).
    pub provider: ProviderKind,
    /// Model id that served the call (self-reported).
    pub model: String,
    /// Task type the call was routed under.
    pub task_type: TaskType,
    /// Complexity the call was routed under.
    pub complexity: Complexity,
    /// Timestamp of the usage record.
    pub timestamp: DateTime<Utc>,
}

/// The result of `route_and_track`: content plus full accounting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedResponse {
    /// Generated content.
    pub content: String,
    /// Token/cost/latency accounting.
    pub usage: CallUsage,
    /// Call identity and classification.
    pub metadata: CallMetadata,
}

/// Cancellation and deadline carried through the call chain.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Cooperative cancellation; honored at every await point.
    pub cancel: CancellationToken,
    /// Per-invocation deadline, when set.
    pub timeout: Option<Duration>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self { cancel: CancellationToken::new(), timeout: None }
    }
}

impl CallContext {
    /// Creates a context with a per-invocation deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { cancel: CancellationToken::new(), timeout: Some(timeout) }
    }
}

/// Bounded retry policy for transient provider errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff delay, doubled per attempt.
    pub base_delay: Duration,
    /// Backoff delay ceiling (before jitter).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_tracked_response_serializes_camel_case() {
        let response = TrackedResponse {
            content: "answer".to_string(),
            usage: CallUsage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
                cost: 0.0125,
                response_time_ms: 800,
            },
            metadata: CallMetadata {
                provider: ProviderKind::OpenAi,
                model: "gpt-4o".to_string(),
                task_type: TaskType::Research,
                complexity: Complexity::Medium,
                timestamp: Utc::now(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["usage"]["inputTokens"], 10);
        assert_eq!(json["usage"]["responseTimeMs"], 800);
        assert_eq!(json["metadata"]["provider"], "openai");
        assert_eq!(json["metadata"]["taskType"], "research");
        assert_eq!(json["metadata"]["complexity"], "medium");
    }

    #[test]
    fn test_intent_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Intent::DeepInfo).unwrap(), "\"deep-info\"");
        assert_eq!(Intent::CompanyInfo.as_str(), "company-info");
    }
}
