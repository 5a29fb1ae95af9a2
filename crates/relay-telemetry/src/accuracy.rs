//! Accuracy tracking for quality assessments.
//!
//! Assessments arrive out-of-band (a human reviewer or an automated grader)
//! against a previously produced query id. Scores are accepted as-is - the
//! 0-1 range is the caller's contract, not enforced here.

use crate::metrics::{
    AccuracyMetric, AccuracyOptions, MAX_QUERY_CHARS, MAX_RESPONSE_CHARS, truncate_chars,
};
use crate::sink::{AnalyticsSink, NoopSink};
use crate::usage::DEFAULT_CAPACITY;
use chrono::Utc;
use relay_abstraction::ProviderKind;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Records one `AccuracyMetric` per quality assessment.
///
/// Same bounded, lock-guarded, append-only semantics as `UsageTracker`.
pub struct AccuracyTracker {
    records: RwLock<VecDeque<AccuracyMetric>>,
    capacity: usize,
    sink: Arc<dyn AnalyticsSink>,
}

impl AccuracyTracker {
    /// Creates a tracker with no sink and default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: DEFAULT_CAPACITY,
            sink: Arc::new(NoopSink),
        }
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

    /// Records one assessment. Always succeeds.
    ///
    /// Missing relevance/completeness/factual-correctness sub-scores default
    /// to the overall `accuracy` value.
    pub fn track_accuracy(
        &self,
        query_id: &str,
        provider: ProviderKind,
        model: &str,
        query: &str,
        response: &str,
        accuracy: f64,
        options: AccuracyOptions,
    ) -> AccuracyMetric {
        let metric = AccuracyMetric {
            query_id: query_id.to_string(),
            provider,
            model: model.to_string(),
            query: truncate_chars(query, MAX_QUERY_CHARS),
            response: truncate_chars(response, MAX_RESPONSE_CHARS),
            expected_response: options.expected_response,
            accuracy,
            relevance: options.relevance.unwrap_or(accuracy),
            completeness: options.completeness.unwrap_or(accuracy),
            factual_correctness: options.factual_correctness.unwrap_or(accuracy),
            timestamp: Utc::now(),
            reviewer: options.reviewer,
            notes: options.notes,
        };

        {
            let mut records = match self.records.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if records.len() == self.capacity {
                records.pop_front();
                debug!(capacity = self.capacity, "Accuracy history at capacity, dropping oldest");
            }
            records.push_back(metric.clone());
        }

        debug!(
            query_id = %query_id,
            provider = %provider,
            model = %model,
            accuracy = accuracy,
            "Tracked accuracy"
        );

        self.forward(metric.clone());
        metric
    }

    /// Forwards a record to the sink without blocking or failing the caller.
    fn forward(&self, metric: AccuracyMetric) {
        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.record_accuracy(&metric).await {
                        warn!(error = %e, "Failed to forward accuracy record (non-blocking)");
                    }
                });
            }
            Err(_) => {
                debug!("No async runtime, accuracy record kept in-memory only");
            }
        }
    }

    /// Snapshot of the tracked records, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<AccuracyMetric> {
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
        debug!("Cleared accuracy history");
    }

    /// Mean overall accuracy grouped by provider.
    #[must_use]
    pub fn average_by_provider(&self) -> HashMap<ProviderKind, f64> {
        let mut sums: HashMap<ProviderKind, (f64, usize)> = HashMap::new();
        for metric in self.history() {
            let entry = sums.entry(metric.provider).or_insert((0.0, 0));
            entry.0 += metric.accuracy;
            entry.1 += 1;
        }
        sums.into_iter().map(|(kind, (sum, count))| (kind, sum / count as f64)).collect()
    }
}

impl Default for AccuracyTracker {
    fn default() -> Self {
        Self::new()
    }
}
