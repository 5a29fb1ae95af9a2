//! Telemetry record types.
//!
//! One `UsageMetric` is appended per LLM invocation and one `AccuracyMetric`
//! per quality assessment. Records serialize camelCase for the analytics
//! sink and are never mutated after creation.

use chrono::{DateTime, Utc};
use relay_abstraction::{Complexity, ProviderKind};
use serde::{Deserialize, Serialize};

/// Maximum stored query length, in characters.
pub const MAX_QUERY_CHARS: usize = 1000;
/// Maximum stored response length, in characters.
pub const MAX_RESPONSE_CHARS: usize = 2000;

/// Truncates a string to at most `max` characters (char-boundary safe).
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// One record per LLM invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetric {
    /// Provider family that served the call.
    pub provider: ProviderKind,
    /// Concrete model id.
    pub model: String,
    /// Task type as a stable string (e.g., "research", "simple-chat").
    pub task_type: String,
    /// Complexity tier resolved for the query.
    pub query_complexity: Complexity,
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Tokens in the completion.
    pub output_tokens: u32,
    /// Derived: input + output.
    pub total_tokens: u32,
    /// Derived cost (currency-agnostic decimal); 0 only for unpriced models.
    pub cost: f64,
    /// Wall-clock latency of the call.
    pub response_time_ms: u64,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Optional conversation correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Optional end-user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Audit copy of the query, truncated to `MAX_QUERY_CHARS`.
    pub query: String,
    /// Audit copy of the response, truncated to `MAX_RESPONSE_CHARS`.
    pub response: String,
    /// Sources attached to the response, when any were extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Whether a web-grounded provider path was used.
    pub web_search_used: bool,
    /// Whether retrieval-augmented context was used.
    pub rag_used: bool,
}

/// Optional fields accepted by `UsageTracker::track_usage`.
///
/// Malformed or missing optional fields never fail tracking.
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    /// Conversation correlation id.
    pub chat_id: Option<String>,
    /// End-user id.
    pub user_id: Option<String>,
    /// Extracted sources to attach.
    pub sources: Option<Vec<String>>,
    /// Web-search flag.
    pub web_search_used: bool,
    /// RAG flag.
    pub rag_used: bool,
}

/// One record per quality assessment of a previously produced response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyMetric {
    /// Correlates to a prior usage record; not enforced by a foreign key.
    pub query_id: String,
    /// Provider family that produced the assessed response.
    pub provider: ProviderKind,
    /// Concrete model id.
    pub model: String,
    /// Audit copy of the query, truncated to `MAX_QUERY_CHARS`.
    pub query: String,
    /// Audit copy of the response, truncated to `MAX_RESPONSE_CHARS`.
    pub response: String,
    /// Reference answer, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
    /// Overall score, nominally 0-1. Accepted as-is, no clamping.
    pub accuracy: f64,
    /// Relevance sub-score; defaults to `accuracy` when unspecified.
    pub relevance: f64,
    /// Completeness sub-score; defaults to `accuracy` when unspecified.
    pub completeness: f64,
    /// Factual-correctness sub-score; defaults to `accuracy` when unspecified.
    pub factual_correctness: f64,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Who produced the assessment (human reviewer or automated grader).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Free-form reviewer notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Optional fields accepted by `AccuracyTracker::track_accuracy`.
#[derive(Debug, Clone, Default)]
pub struct AccuracyOptions {
    /// Reference answer.
    pub expected_response: Option<String>,
    /// Relevance sub-score override.
    pub relevance: Option<f64>,
    /// Completeness sub-score override.
    pub completeness: Option<f64>,
    /// Factual-correctness sub-score override.
    pub factual_correctness: Option<f64>,
    /// Reviewer identity.
    pub reviewer: Option<String>,
    /// Reviewer notes.
    pub notes: Option<String>,
}

/// Half-open `[start, end)` window for analytics queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Timeframe {
    /// Inclusive lower bound; unbounded when `None`.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound; unbounded when `None`.
    pub end: Option<DateTime<Utc>>,
}

impl Timeframe {
    /// Creates a fully-bounded window.
    #[must_use]
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// Whether a timestamp falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| timestamp >= start)
            && self.end.is_none_or(|end| timestamp < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_chars_boundary_safe() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters must not split.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_timeframe_half_open() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let window = Timeframe::between(start, end);

        assert!(window.contains(start));
        assert!(window.contains(start + chrono::Duration::days(10)));
        assert!(!window.contains(end));
        assert!(!window.contains(start - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_timeframe_unbounded_contains_everything() {
        let window = Timeframe::default();
        assert!(window.contains(Utc::now()));
    }

    #[test]
    fn test_usage_metric_serializes_camel_case() {
        let metric = UsageMetric {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            task_type: "research".to_string(),
            query_complexity: Complexity::Medium,
            input_tokens: 10,
            output_tokens: 20,
            total_tokens: 30,
            cost: 0.0002,
            response_time_ms: 1200,
            timestamp: Utc::now(),
            chat_id: None,
            user_id: None,
            query: "q".to_string(),
            response: "r".to_string(),
            sources: None,
            web_search_used: false,
            rag_used: false,
        };

        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["taskType"], "research");
        assert_eq!(json["queryComplexity"], "medium");
        assert_eq!(json["inputTokens"], 10);
        assert_eq!(json["totalTokens"], 30);
        assert_eq!(json["responseTimeMs"], 1200);
        assert!(json.get("chatId").is_none());
    }
}
