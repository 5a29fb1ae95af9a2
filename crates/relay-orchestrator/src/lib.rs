//! Tracked LLM orchestration for Relay.
//!
//! This crate ties the core together: a heuristic task classifier, a
//! priority-table model router that records usage telemetry for every call,
//! and the plan → research → synthesize pipeline with provider comparison.
//!
//! The `Orchestrator` facade is the query surface external collaborators
//! (HTTP handlers, the CLI) consume. It is an explicitly constructed,
//! injected service: build it once at process start and share it by
//! reference; tests construct a fresh instance.

pub mod classifier;
pub mod config;
pub mod error;
pub mod research;
pub mod routing;

use relay_abstraction::{Complexity, ProviderKind, TaskType};
use relay_models::ProviderRegistry;
use relay_telemetry::{
    AccuracyMetric, AccuracyOptions, AccuracyTracker, Analytics, AnalyticsSink, HttpSink,
    NoopSink, PricingTable, Timeframe, UsageTracker,
};
use std::sync::Arc;
use tracing::info;

pub use classifier::{QueryProfile, TaskClassifier};
pub use config::{
    ConfigError, LimitsConfig, OrchestratorConfig, QualityConfig, RecommendationConfig,
    RetryConfig, SinkConfig,
};
pub use error::{OrchestratorError, Result};
pub use research::{
    ComparisonSummary, ProviderComparison, ResearchConfig, ResearchMetadata, ResearchOrchestrator,
    ResearchResult, ResearchUsage, SourceDetail, StageUsage,
};
pub use routing::{
    CallContext, CallMetadata, CallUsage, Intent, ModelRouter, PrivacyLevel, RetryPolicy,
    RouteOptions, RoutingDecision, TrackedResponse, catalog,
};

/// The query surface of the orchestration core.
pub struct Orchestrator {
    router: Arc<ModelRouter>,
    research: ResearchOrchestrator,
    usage: Arc<UsageTracker>,
    accuracy: Arc<AccuracyTracker>,
    classifier: TaskClassifier,
}

impl Orchestrator {
    /// Creates an orchestrator with default configuration.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        // The default configuration always validates.
        Self::with_config(registry, &OrchestratorConfig::default())
            .unwrap_or_else(|_| unreachable!("default configuration is valid"))
    }

    /// Creates an orchestrator from configuration.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or a pricing override
    /// file cannot be loaded.
    pub fn with_config(
        registry: Arc<ProviderRegistry>,
        config: &OrchestratorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pricing = match &config.pricing_overrides {
            Some(path) => PricingTable::load(path)
                .map_err(|e| ConfigError::Validation(e.to_string()))?,
            None => PricingTable::builtin(),
        };

        let sink: Arc<dyn AnalyticsSink> = match &config.sink.base_url {
            Some(base_url) => Arc::new(HttpSink::new(base_url.clone())),
            None => Arc::new(NoopSink),
        };

        let usage = Arc::new(
            UsageTracker::new()
                .with_pricing(pricing)
                .with_sink(Arc::clone(&sink))
                .with_capacity(config.limits.usage_capacity),
        );
        let accuracy = Arc::new(
            AccuracyTracker::new()
                .with_sink(sink)
                .with_capacity(config.limits.accuracy_capacity),
        );

        let router = Arc::new(
            ModelRouter::new(registry, Arc::clone(&usage))
                .with_retry_policy(config.retry.policy()),
        );
        let research = ResearchOrchestrator::new(Arc::clone(&router))
            .with_quality(config.quality.clone())
            .with_recommendation(config.recommendation.clone());

        info!(
            usage_capacity = config.limits.usage_capacity,
            sink = config.sink.base_url.as_deref().unwrap_or("none"),
            "Orchestrator initialized"
        );

        Ok(Self { router, research, usage, accuracy, classifier: TaskClassifier::new() })
    }

    /// Infers task type and complexity for a raw query.
    #[must_use]
    pub fn analyze_query(&self, query: &str) -> QueryProfile {
        self.classifier.analyze(query)
    }

    /// Evaluates the routing table without invoking anything (explain mode).
    #[must_use]
    pub fn route(
        &self,
        task_type: TaskType,
        complexity: Complexity,
        options: &RouteOptions,
    ) -> RoutingDecision {
        self.router.route(task_type, complexity, options)
    }

    /// Routes one query, invokes the selected provider, and records usage.
    ///
    /// Task type and complexity are inferred from the query when not
    /// supplied.
    ///
    /// # Errors
    /// Propagates provider errors unmodified; see `ModelRouter`.
    pub async fn route_and_track(
        &self,
        task_type: Option<TaskType>,
        query: &str,
        complexity: Option<Complexity>,
        options: &RouteOptions,
        ctx: &CallContext,
    ) -> Result<TrackedResponse> {
        let inferred = self.classifier.analyze(query);
        self.router
            .route_and_track(
                task_type.unwrap_or(inferred.task_type),
                query,
                complexity.unwrap_or(inferred.complexity),
                options,
                ctx,
            )
            .await
    }

    /// Runs the three-stage research pipeline.
    ///
    /// # Errors
    /// A stage failure aborts the pipeline; see `ResearchOrchestrator`.
    pub async fn research_with_tracking(
        &self,
        query: &str,
        config: &ResearchConfig,
        ctx: &CallContext,
    ) -> Result<ResearchResult> {
        self.research.research_with_tracking(query, config, ctx).await
    }

    /// Runs the pipeline against both provider families and compares them.
    ///
    /// # Errors
    /// Either arm's failure propagates; see `ResearchOrchestrator`.
    pub async fn compare_providers(
        &self,
        query: &str,
        config: &ResearchConfig,
        ctx: &CallContext,
    ) -> Result<ProviderComparison> {
        self.research.compare_providers(query, config, ctx).await
    }

    /// Aggregate analytics over an optional time window.
    #[must_use]
    pub fn get_analytics(&self, timeframe: Option<&Timeframe>) -> Analytics {
        self.usage.analytics(timeframe, &self.accuracy)
    }

    /// Records a quality assessment against a previously produced query id.
    #[allow(clippy::too_many_arguments)] // Mirrors the per-assessment fields of the record
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
        self.accuracy.track_accuracy(query_id, provider, model, query, response, accuracy, options)
    }

    /// Administrative reset of both tracked collections. Irreversible;
    /// intended for test/staging use.
    pub fn clear_history(&self) {
        self.usage.clear();
        self.accuracy.clear();
        info!("Cleared usage and accuracy history");
    }

    /// Access to the usage tracker.
    #[must_use]
    pub fn usage_tracker(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    /// Access to the accuracy tracker.
    #[must_use]
    pub fn accuracy_tracker(&self) -> &Arc<AccuracyTracker> {
        &self.accuracy
    }

    /// Access to the router.
    #[must_use]
    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }
}
