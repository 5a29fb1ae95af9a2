//! Telemetry for Relay's tracked LLM orchestration.
//!
//! Every routed invocation produces a `UsageMetric` with token counts, cost,
//! and latency; quality assessments produce `AccuracyMetric` records. Both
//! trackers hold bounded in-process history (the external analytics sink owns
//! durable storage) and are explicitly constructed, injected services -
//! constructed once at process start and shared by reference.

pub mod accuracy;
pub mod analytics;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod sink;
pub mod usage;

pub use accuracy::AccuracyTracker;
pub use analytics::{Analytics, ModelAnalytics, ProviderAnalytics};
pub use error::{SinkError, TelemetryError};
pub use metrics::{
    AccuracyMetric, AccuracyOptions, MAX_QUERY_CHARS, MAX_RESPONSE_CHARS, Timeframe, TrackOptions,
    UsageMetric,
};
pub use pricing::{CostEntry, PricingTable, estimate_tokens};
pub use sink::{AnalyticsSink, HttpSink, NoopSink};
pub use usage::{DEFAULT_CAPACITY, UsageTracker};
