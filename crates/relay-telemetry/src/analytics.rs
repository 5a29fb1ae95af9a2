//! Aggregate analytics computed over tracked usage.

use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate view over a (possibly time-filtered) set of usage records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    /// Number of records in the window.
    pub total_queries: usize,
    /// Sum of record costs.
    pub total_cost: f64,
    /// Mean response time; 0 when the window is empty.
    pub average_response_time_ms: f64,
    /// Per-provider breakdown, keyed by provider name.
    pub providers: BTreeMap<String, ProviderAnalytics>,
    /// Usage counts by task type.
    pub task_types: BTreeMap<String, usize>,
    /// Sum of input tokens.
    pub total_input_tokens: u64,
    /// Sum of output tokens.
    pub total_output_tokens: u64,
    /// Sum of all tokens.
    pub total_tokens: u64,
    /// Top models by call count (at most 10), with associated cost.
    pub top_models: Vec<ModelAnalytics>,
}

/// Per-provider slice of the analytics window.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAnalytics {
    /// Number of records for this provider.
    pub queries: usize,
    /// Sum of costs for this provider.
    pub cost: f64,
    /// Mean accuracy over assessments for this provider, when any exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_accuracy: Option<f64>,
}

/// Per-model slice of the analytics window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAnalytics {
    /// Model id.
    pub model: String,
    /// Call count.
    pub calls: usize,
    /// Sum of costs.
    pub cost: f64,
}
