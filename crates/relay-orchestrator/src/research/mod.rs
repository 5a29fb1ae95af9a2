//! The plan → research → synthesize pipeline.
//!
//! Three dependent routed calls compose one logical research operation. The
//! stages are strictly sequential (each prompt embeds the previous stage's
//! output); any stage error aborts the remainder and propagates wrapped with
//! the stage label. Usage already tracked for completed stages stays
//! recorded - a mid-pipeline telemetry record is more useful than none.

pub mod comparison;
pub mod prompts;
pub mod sources;

pub use comparison::{ComparisonSummary, ProviderComparison};
pub use sources::SourceDetail;

use crate::classifier::TaskClassifier;
use crate::config::{QualityConfig, RecommendationConfig};
use crate::error::{OrchestratorError, Result};
use crate::routing::{CallContext, CallUsage, Intent, ModelRouter, RouteOptions, TrackedResponse};
use chrono::{DateTime, Utc};
use relay_abstraction::{Complexity, ProviderKind, TaskType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-request pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct ResearchConfig {
    /// Task type; inferred from the query when absent.
    pub task_type: Option<TaskType>,
    /// Complexity; inferred from the query when absent.
    pub complexity: Option<Complexity>,
    /// Carry the web-search flag into the research stage.
    pub requires_web_search: bool,
    /// Carry the RAG flag into the research stage.
    pub rag_used: bool,
    /// Conversation correlation id; a fresh one is minted when absent.
    pub chat_id: Option<String>,
    /// End-user id carried into telemetry.
    pub user_id: Option<String>,
}

/// Usage accounting for one pipeline stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUsage {
    /// Stage label ("plan", "research", "synthesize").
    pub stage: &'static str,
    /// Provider family that served the stage.
    pub provider: ProviderKind,
    /// Model id that served the stage.
    pub model: String,
    /// Token/cost/latency accounting for the stage.
    pub usage: CallUsage,
}

/// Aggregate usage across the pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchUsage {
    /// Sum of stage costs.
    pub total_cost: f64,
    /// Sum of stage tokens.
    pub total_tokens: u32,
    /// Sum of stage latencies.
    pub total_response_time_ms: u64,
    /// Per-stage breakdown, exactly one entry per stage.
    pub breakdown: Vec<StageUsage>,
}

/// Metadata describing one composed research operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchMetadata {
    /// The original query.
    pub query: String,
    /// Resolved task type.
    pub task_type: TaskType,
    /// Resolved complexity.
    pub complexity: Complexity,
    /// Whether the research stage was web-grounded.
    pub web_search_used: bool,
    /// Whether retrieval-augmented context was used.
    pub rag_used: bool,
    /// Correlation id shared by the stage telemetry records.
    pub correlation_id: String,
    /// Always `orchestrated`: this is composed output, not one vendor's.
    pub provider: ProviderKind,
    /// Completion timestamp.
    pub timestamp: DateTime<Utc>,
}

/// The composed result of one research operation.
///
/// Not persisted by this core; ownership of persistence belongs to the
/// caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    /// The synthesized answer.
    pub answer: String,
    /// Flat extracted source list.
    pub sources: Vec<String>,
    /// URL sources enriched with display metadata.
    pub detailed_sources: Vec<SourceDetail>,
    /// Aggregate and per-stage usage.
    pub usage: ResearchUsage,
    /// Operation metadata.
    pub metadata: ResearchMetadata,
}

/// Which provider family a comparison run pins the whole pipeline to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelinePin {
    /// Normal routing: plan/synthesize force the capable family, the
    /// research stage routes on its own signals.
    None,
    /// Every stage pinned to the capable (OpenAI) family.
    Capable,
    /// Every stage pinned to the alternate (Gemini) family.
    Alternate,
}

/// Drives the three-stage pipeline and provider comparisons over a router.
pub struct ResearchOrchestrator {
    router: Arc<ModelRouter>,
    classifier: TaskClassifier,
    pub(crate) quality: QualityConfig,
    pub(crate) recommendation: RecommendationConfig,
}

impl ResearchOrchestrator {
    /// Creates an orchestrator with default heuristic thresholds.
    #[must_use]
    pub fn new(router: Arc<ModelRouter>) -> Self {
        Self {
            router,
            classifier: TaskClassifier::new(),
            quality: QualityConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }

    /// Sets the quality-score thresholds.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the recommendation thresholds.
    #[must_use]
    pub fn with_recommendation(mut self, recommendation: RecommendationConfig) -> Self {
        self.recommendation = recommendation;
        self
    }

    /// Access to the router the pipeline issues calls through.
    #[must_use]
    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }

    /// Runs the full plan → research → synthesize pipeline for one query.
    ///
    /// # Errors
    /// Any stage failure aborts the remaining stages and propagates wrapped
    /// with the stage label. There is no partial-result return; the caller
    /// may degrade to a single routed call if desired.
    pub async fn research_with_tracking(
        &self,
        query: &str,
        config: &ResearchConfig,
        ctx: &CallContext,
    ) -> Result<ResearchResult> {
        self.run_pipeline(query, config, ctx, PipelinePin::None, Uuid::new_v4().to_string())
            .await
    }

    /// Pipeline body shared by the normal path and comparison mode.
    pub(crate) async fn run_pipeline(
        &self,
        query: &str,
        config: &ResearchConfig,
        ctx: &CallContext,
        pin: PipelinePin,
        correlation_id: String,
    ) -> Result<ResearchResult> {
        let inferred = self.classifier.analyze(query);
        let task_type = config.task_type.unwrap_or(inferred.task_type);
        let complexity = config.complexity.unwrap_or(inferred.complexity);
        let chat_id = config.chat_id.clone().unwrap_or_else(|| correlation_id.clone());

        info!(
            correlation_id = %correlation_id,
            task_type = %task_type,
            complexity = %complexity,
            pin = ?pin,
            "Starting research pipeline"
        );

        // Stage 1: plan. Forces the capable family at high complexity with
        // analysis intent (unless the whole run is pinned to the alternate).
        let plan_options = RouteOptions {
            force_gpt: pin != PipelinePin::Alternate,
            force_alternate: pin == PipelinePin::Alternate,
            intent: Some(Intent::Analysis),
            chat_id: Some(chat_id.clone()),
            user_id: config.user_id.clone(),
            ..RouteOptions::default()
        };
        let plan = stage(
            "plan",
            self.router
                .route_and_track(
                    task_type,
                    &prompts::plan_prompt(query),
                    Complexity::High,
                    &plan_options,
                    ctx,
                )
                .await,
        )?;

        // Stage 2: research under the caller-resolved classification,
        // carrying the web-search/RAG flags forward.
        let research_options = RouteOptions {
            force_gpt: pin == PipelinePin::Capable,
            force_alternate: pin == PipelinePin::Alternate,
            requires_web_search: config.requires_web_search,
            rag_used: config.rag_used,
            chat_id: Some(chat_id.clone()),
            user_id: config.user_id.clone(),
            ..RouteOptions::default()
        };
        let research = stage(
            "research",
            self.router
                .route_and_track(
                    task_type,
                    &prompts::research_prompt(query, &plan.content),
                    complexity,
                    &research_options,
                    ctx,
                )
                .await,
        )?;

        // Stage 3: synthesize through the capable family's summarization path.
        let synthesis_options = RouteOptions {
            force_gpt: pin != PipelinePin::Alternate,
            force_alternate: pin == PipelinePin::Alternate,
            intent: Some(Intent::Summarization),
            chat_id: Some(chat_id.clone()),
            user_id: config.user_id.clone(),
            ..RouteOptions::default()
        };
        let synthesis = stage(
            "synthesize",
            self.router
                .route_and_track(
                    task_type,
                    &prompts::synthesis_prompt(query, &research.content),
                    complexity,
                    &synthesis_options,
                    ctx,
                )
                .await,
        )?;

        let (source_list, detailed_sources) = sources::extract_sources(&synthesis.content);

        let stages =
            [("plan", &plan), ("research", &research), ("synthesize", &synthesis)];
        let usage = ResearchUsage {
            total_cost: stages.iter().map(|(_, s)| s.usage.cost).sum(),
            total_tokens: stages.iter().map(|(_, s)| s.usage.total_tokens).sum(),
            total_response_time_ms: stages.iter().map(|(_, s)| s.usage.response_time_ms).sum(),
            breakdown: stages
                .iter()
                .map(|&(label, s)| StageUsage {
                    stage: label,
                    provider: s.metadata.provider,
                    model: s.metadata.model.clone(),
                    usage: s.usage,
                })
                .collect(),
        };

        info!(
            correlation_id = %correlation_id,
            total_cost = usage.total_cost,
            total_tokens = usage.total_tokens,
            total_response_time_ms = usage.total_response_time_ms,
            sources = source_list.len(),
            "Research pipeline completed"
        );

        Ok(ResearchResult {
            answer: synthesis.content,
            sources: source_list,
            detailed_sources,
            usage,
            metadata: ResearchMetadata {
                query: query.to_string(),
                task_type,
                complexity,
                web_search_used: config.requires_web_search,
                rag_used: config.rag_used,
                correlation_id,
                provider: ProviderKind::Orchestrated,
                timestamp: Utc::now(),
            },
        })
    }
}

/// Wraps a stage outcome with its label, logging the abort on failure.
fn stage(label: &'static str, outcome: Result<TrackedResponse>) -> Result<TrackedResponse> {
    outcome.map_err(|e| {
        warn!(stage = label, error = %e, "Research stage failed, aborting pipeline");
        OrchestratorError::Stage { stage: label, source: Box::new(e) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::catalog;
    use relay_abstraction::ProviderError;
    use relay_models::{MockProvider, ProviderRegistry};
    use relay_telemetry::UsageTracker;

    fn mock_orchestrator() -> ResearchOrchestrator {
        let registry = Arc::new(ProviderRegistry::with_mocks(catalog::ALL));
        let usage = Arc::new(UsageTracker::new());
        ResearchOrchestrator::new(Arc::new(ModelRouter::new(registry, usage)))
    }

    #[tokio::test]
    async fn test_pipeline_sums_match_breakdown() {
        let orchestrator = mock_orchestrator();
        let result = orchestrator
            .research_with_tracking(
                "What are the latest trends in AI?",
                &ResearchConfig::default(),
                &CallContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.usage.breakdown.len(), 3);
        assert_eq!(result.usage.breakdown[0].stage, "plan");
        assert_eq!(result.usage.breakdown[2].stage, "synthesize");

        let cost_sum: f64 = result.usage.breakdown.iter().map(|s| s.usage.cost).sum();
        let token_sum: u32 = result.usage.breakdown.iter().map(|s| s.usage.total_tokens).sum();
        let time_sum: u64 =
            result.usage.breakdown.iter().map(|s| s.usage.response_time_ms).sum();
        assert_eq!(result.usage.total_cost, cost_sum);
        assert_eq!(result.usage.total_tokens, token_sum);
        assert_eq!(result.usage.total_response_time_ms, time_sum);

        assert_eq!(result.metadata.provider, ProviderKind::Orchestrated);
        assert_eq!(result.metadata.task_type, TaskType::Research);
    }

    #[tokio::test]
    async fn test_pipeline_tracks_three_usage_records() {
        let orchestrator = mock_orchestrator();
        orchestrator
            .research_with_tracking(
                "research the market",
                &ResearchConfig::default(),
                &CallContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(orchestrator.router().usage().len(), 3);
    }

    #[tokio::test]
    async fn test_stage_routing_plan_forces_capable_deep_model() {
        let orchestrator = mock_orchestrator();
        orchestrator
            .research_with_tracking(
                "research the market",
                &ResearchConfig::default(),
                &CallContext::default(),
            )
            .await
            .unwrap();

        let history = orchestrator.router().usage().history();
        // Plan: force_gpt + high complexity + analysis intent -> deepest model.
        assert_eq!(history[0].model, catalog::GPT_DEEP);
        // Synthesize: force_gpt + summarization intent -> light model.
        assert_eq!(history[2].model, catalog::GPT_LIGHT);
    }

    #[tokio::test]
    async fn test_stage_failure_aborts_and_keeps_completed_records() {
        let registry = Arc::new(ProviderRegistry::with_mocks(catalog::ALL));
        // Stage 2 (research, medium complexity, no pin) routes research task
        // to the capable default model; make that one fail.
        registry.register(Arc::new(
            MockProvider::new(ProviderKind::OpenAi, catalog::GPT_DEFAULT.to_string())
                .failing(ProviderError::ResponseError("provider down".to_string())),
        ));
        let usage = Arc::new(UsageTracker::new());
        let orchestrator =
            ResearchOrchestrator::new(Arc::new(ModelRouter::new(registry, usage.clone())));

        let config = ResearchConfig {
            task_type: Some(TaskType::Research),
            complexity: Some(Complexity::Medium),
            ..ResearchConfig::default()
        };
        let err = orchestrator
            .research_with_tracking("doomed query", &config, &CallContext::default())
            .await
            .unwrap_err();

        match err {
            OrchestratorError::Stage { stage, .. } => assert_eq!(stage, "research"),
            other => panic!("expected stage error, got {other}"),
        }
        // The plan stage completed and its telemetry survives the abort.
        assert_eq!(usage.len(), 1);
        assert_eq!(usage.history()[0].model, catalog::GPT_DEEP);
    }

    #[tokio::test]
    async fn test_sources_flow_from_synthesis_text() {
        let registry = Arc::new(ProviderRegistry::with_mocks(catalog::ALL));
        registry.register(Arc::new(
            MockProvider::new(ProviderKind::OpenAi, catalog::GPT_LIGHT.to_string())
                .with_response("Summary.\n\nSources:\n- https://example.com/market-report"),
        ));
        let usage = Arc::new(UsageTracker::new());
        let orchestrator = ResearchOrchestrator::new(Arc::new(ModelRouter::new(registry, usage)));

        let result = orchestrator
            .research_with_tracking(
                "research the market",
                &ResearchConfig::default(),
                &CallContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.sources, vec!["https://example.com/market-report"]);
        assert_eq!(result.detailed_sources[0].title, "example.com");
    }

    #[tokio::test]
    async fn test_config_overrides_classification() {
        let orchestrator = mock_orchestrator();
        let config = ResearchConfig {
            task_type: Some(TaskType::CompanyAnalysis),
            complexity: Some(Complexity::High),
            ..ResearchConfig::default()
        };
        let result = orchestrator
            .research_with_tracking("hello", &config, &CallContext::default())
            .await
            .unwrap();

        assert_eq!(result.metadata.task_type, TaskType::CompanyAnalysis);
        assert_eq!(result.metadata.complexity, Complexity::High);
    }
}
