//! Usage tracking for every LLM invocation.

use crate::accuracy::AccuracyTracker;
use crate::analytics::{Analytics, ModelAnalytics, ProviderAnalytics};
use crate::metrics::{
    MAX_QUERY_CHARS, MAX_RESPONSE_CHARS, Timeframe, TrackOptions, UsageMetric, truncate_chars,
};
use crate::pricing::PricingTable;
use crate::sink::{AnalyticsSink, NoopSink};
use chrono::Utc;
use relay_abstraction::{Complexity, ProviderKind, TaskType};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Default in-memory record capacity.
///
/// The in-process collection is a bounded cache in front of the external
/// analytics sink, which owns durable history.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Records one `UsageMetric` per LLM invocation and serves aggregate analytics.
///
/// Appends are lock-guarded so concurrent requests never lose updates; reads
/// take a copy-on-read snapshot without blocking appends. Records are
/// append-only and never mutated; only `clear` removes them.
pub struct UsageTracker {
    /// Bounded record store (ring semantics: oldest dropped at capacity).
    records: RwLock<VecDeque<UsageMetric>>,
    capacity: usize,
    pricing: PricingTable,
    sink: Arc<dyn AnalyticsSink>,
}

impl UsageTracker {
    /// Creates a tracker with built-in pricing, no sink, default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: DEFAULT_CAPACITY,
            pricing: PricingTable::builtin(),
            sink: Arc::new(NoopSink),
        }
    }

    /// Replaces the pricing table.
    #[must_use]
    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Sets the analytics sink records are forwarded to.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the in-memory record capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Access to the pricing table (shared with routing for cost estimates).
    #[must_use]
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Records one invocation. Always succeeds.
    ///
    /// Query and response are truncated to bounded lengths before storage to
    /// cap per-record memory growth. The record is appended to the shared
    /// collection and forwarded to the analytics sink fire-and-forget.
    #[allow(clippy::too_many_arguments)] // Mirrors the per-call fields of the record itself
    pub fn track_usage(
        &self,
        provider: ProviderKind,
        model: &str,
        task_type: TaskType,
        complexity: Complexity,
        input_tokens: u32,
        output_tokens: u32,
        response_time_ms: u64,
        query: &str,
        response: &str,
        options: TrackOptions,
    ) -> UsageMetric {
        let cost = self.pricing.cost(model, input_tokens, output_tokens);

        let metric = UsageMetric {
            provider,
            model: model.to_string(),
            task_type: task_type.as_str().to_string(),
            query_complexity: complexity,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost,
            response_time_ms,
            timestamp: Utc::now(),
            chat_id: options.chat_id,
            user_id: options.user_id,
            query: truncate_chars(query, MAX_QUERY_CHARS),
            response: truncate_chars(response, MAX_RESPONSE_CHARS),
            sources: options.sources,
            web_search_used: options.web_search_used,
            rag_used: options.rag_used,
        };

        {
            let mut records = match self.records.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if records.len() == self.capacity {
                records.pop_front();
                debug!(capacity = self.capacity, "Usage history at capacity, dropping oldest");
            }
            records.push_back(metric.clone());
        }

        debug!(
            provider = %provider,
            model = %model,
            task_type = %task_type,
            total_tokens = metric.total_tokens,
            cost = metric.cost,
            response_time_ms = response_time_ms,
            "Tracked usage"
        );

        self.forward(metric.clone());
        metric
    }

    /// Forwards a record to the sink without blocking or failing the caller.
    fn forward(&self, metric: UsageMetric) {
        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.record_usage(&metric).await {
                        warn!(error = %e, "Failed to forward usage record (non-blocking)");
                    }
                });
            }
            Err(_) => {
                debug!("No async runtime, usage record kept in-memory only");
            }
        }
    }

    /// Snapshot of the tracked records, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<UsageMetric> {
        let records = match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.iter().cloned().collect()
    }

    /// Number of tracked records.
    #[must_use]
    pub fn len(&self) -> usize {
        let records = match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.len()
    }

    /// Whether no records are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Administrative reset. Irreversible.
    pub fn clear(&self) {
        let mut records = match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.clear();
        debug!("Cleared usage history");
    }

    /// Computes aggregate analytics over an optional `[start, end)` window.
    ///
    /// Per-provider accuracy is joined from the accuracy tracker by provider.
    /// Single linear pass over the filtered records; an empty window yields
    /// zero counts and a mean response time of 0.
    #[must_use]
    pub fn analytics(
        &self,
        timeframe: Option<&Timeframe>,
        accuracy: &AccuracyTracker,
    ) -> Analytics {
        let snapshot = self.history();
        let filtered: Vec<&UsageMetric> = snapshot
            .iter()
            .filter(|m| timeframe.is_none_or(|window| window.contains(m.timestamp)))
            .collect();

        let total_queries = filtered.len();
        let mut total_cost = 0.0;
        let mut total_response_time_ms: u64 = 0;
        let mut total_input_tokens: u64 = 0;
        let mut total_output_tokens: u64 = 0;
        let mut providers: HashMap<ProviderKind, ProviderAnalytics> = HashMap::new();
        let mut task_types: HashMap<String, usize> = HashMap::new();
        let mut models: HashMap<String, (usize, f64)> = HashMap::new();

        for metric in &filtered {
            total_cost += metric.cost;
            total_response_time_ms += metric.response_time_ms;
            total_input_tokens += u64::from(metric.input_tokens);
            total_output_tokens += u64::from(metric.output_tokens);

            let provider = providers.entry(metric.provider).or_default();
            provider.queries += 1;
            provider.cost += metric.cost;

            *task_types.entry(metric.task_type.clone()).or_insert(0) += 1;

            let model = models.entry(metric.model.clone()).or_insert((0, 0.0));
            model.0 += 1;
            model.1 += metric.cost;
        }

        let accuracy_by_provider = accuracy.average_by_provider();
        let providers = providers
            .into_iter()
            .map(|(kind, mut stats)| {
                stats.average_accuracy = accuracy_by_provider.get(&kind).copied();
                (kind.as_str().to_string(), stats)
            })
            .collect();

        let mut top_models: Vec<ModelAnalytics> = models
            .into_iter()
            .map(|(model, (calls, cost))| ModelAnalytics { model, calls, cost })
            .collect();
        // Call count descending, model name as a deterministic tie-break.
        top_models.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.model.cmp(&b.model)));
        top_models.truncate(10);

        let average_response_time_ms = if total_queries == 0 {
            0.0
        } else {
            total_response_time_ms as f64 / total_queries as f64
        };

        Analytics {
            total_queries,
            total_cost,
            average_response_time_ms,
            providers,
            task_types: task_types.into_iter().collect(),
            total_input_tokens,
            total_output_tokens,
            total_tokens: total_input_tokens + total_output_tokens,
            top_models,
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}
