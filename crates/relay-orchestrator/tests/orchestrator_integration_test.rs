//! End-to-end tests for the orchestration query surface over mock providers.

use relay_abstraction::{Complexity, ProviderKind, TaskType};
use relay_models::{MockProvider, ProviderRegistry};
use relay_orchestrator::{
    CallContext, Orchestrator, OrchestratorError, ResearchConfig, RouteOptions, catalog,
};
use relay_telemetry::{AccuracyOptions, Timeframe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn mock_orchestrator() -> Orchestrator {
    Orchestrator::new(Arc::new(ProviderRegistry::with_mocks(catalog::ALL)))
}

#[tokio::test]
async fn test_latest_trends_scenario_end_to_end() {
    let orchestrator = mock_orchestrator();

    let response = orchestrator
        .route_and_track(
            None,
            "What are the latest trends in AI?",
            None,
            &RouteOptions::default(),
            &CallContext::default(),
        )
        .await
        .unwrap();

    // Classified as research at low complexity, routed to the capable
    // provider's default model.
    assert_eq!(response.metadata.task_type, TaskType::Research);
    assert_eq!(response.metadata.complexity, Complexity::Low);
    assert_eq!(response.metadata.provider, ProviderKind::OpenAi);
    assert_eq!(response.metadata.model, catalog::GPT_DEFAULT);

    let history = orchestrator.usage_tracker().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_tokens, history[0].input_tokens + history[0].output_tokens);
}

#[tokio::test]
async fn test_routing_priority_with_conflicting_options() {
    let orchestrator = mock_orchestrator();

    let conflicting = RouteOptions {
        force_gpt: true,
        privacy_level: relay_orchestrator::PrivacyLevel::Private,
        requires_web_search: true,
        ..RouteOptions::default()
    };
    let decision = orchestrator.route(TaskType::Research, Complexity::High, &conflicting);
    assert_eq!(decision.rule, "force-gpt");
    assert_eq!(decision.provider, ProviderKind::OpenAi);

    let no_force = RouteOptions { force_gpt: false, ..conflicting };
    let decision = orchestrator.route(TaskType::Research, Complexity::High, &no_force);
    assert_eq!(decision.rule, "privacy");
    assert_eq!(decision.provider, ProviderKind::Gemini);
}

#[tokio::test]
async fn test_research_pipeline_and_analytics() {
    let orchestrator = mock_orchestrator();

    let result = orchestrator
        .research_with_tracking(
            "research detailed funding history of our top competitor",
            &ResearchConfig::default(),
            &CallContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.usage.breakdown.len(), 3);
    let stage_cost: f64 = result.usage.breakdown.iter().map(|s| s.usage.cost).sum();
    assert_eq!(result.usage.total_cost, stage_cost);

    let analytics = orchestrator.get_analytics(None);
    assert_eq!(analytics.total_queries, 3);
    let tracked_cost: f64 =
        orchestrator.usage_tracker().history().iter().map(|m| m.cost).sum();
    assert!((analytics.total_cost - tracked_cost).abs() < 1e-12);
    assert!(!analytics.top_models.is_empty());
}

#[tokio::test]
async fn test_accuracy_defaults_and_provider_join() {
    let orchestrator = mock_orchestrator();

    orchestrator
        .route_and_track(
            Some(TaskType::SimpleChat),
            "hi",
            Some(Complexity::Low),
            &RouteOptions::default(),
            &CallContext::default(),
        )
        .await
        .unwrap();

    let metric = orchestrator.track_accuracy(
        "query-1",
        ProviderKind::Gemini,
        catalog::GEMINI_FAST,
        "hi",
        "hello",
        0.95,
        AccuracyOptions::default(),
    );
    assert_eq!(metric.relevance, 0.95);
    assert_eq!(metric.completeness, 0.95);

    let analytics = orchestrator.get_analytics(None);
    let gemini = &analytics.providers["gemini"];
    assert_eq!(gemini.queries, 1);
    assert!((gemini.average_accuracy.unwrap() - 0.95).abs() < 1e-12);
}

#[tokio::test]
async fn test_clear_history_resets_both_trackers() {
    let orchestrator = mock_orchestrator();

    orchestrator
        .route_and_track(None, "hello there", None, &RouteOptions::default(), &CallContext::default())
        .await
        .unwrap();
    orchestrator.track_accuracy(
        "q",
        ProviderKind::Gemini,
        catalog::GEMINI_FAST,
        "q",
        "r",
        0.5,
        AccuracyOptions::default(),
    );

    orchestrator.clear_history();
    assert!(orchestrator.usage_tracker().is_empty());
    assert!(orchestrator.accuracy_tracker().is_empty());
    assert_eq!(orchestrator.get_analytics(None).total_queries, 0);
}

#[tokio::test]
async fn test_empty_timeframe_yields_zeroes() {
    let orchestrator = mock_orchestrator();
    let analytics = orchestrator.get_analytics(Some(&Timeframe::default()));
    assert_eq!(analytics.total_queries, 0);
    assert_eq!(analytics.average_response_time_ms, 0.0);
}

#[tokio::test]
async fn test_cancelled_pipeline_keeps_completed_stage_records() {
    let registry = Arc::new(ProviderRegistry::with_mocks(catalog::ALL));
    // Slow down the research-stage model so cancellation lands mid-pipeline.
    registry.register(Arc::new(SlowProvider {
        inner: MockProvider::new(ProviderKind::OpenAi, catalog::GPT_DEFAULT.to_string()),
        delay: Duration::from_millis(200),
    }));
    let orchestrator = Orchestrator::new(registry);

    let cancel = CancellationToken::new();
    let ctx = CallContext { cancel: cancel.clone(), timeout: None };
    let config = ResearchConfig {
        task_type: Some(TaskType::Research),
        complexity: Some(Complexity::Medium),
        ..ResearchConfig::default()
    };

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let err = orchestrator
        .research_with_tracking("doomed research", &config, &ctx)
        .await
        .unwrap_err();
    handle.await.unwrap();

    match err {
        OrchestratorError::Stage { stage, source } => {
            assert_eq!(stage, "research");
            assert!(matches!(*source, OrchestratorError::Cancelled));
        }
        other => panic!("expected stage cancellation, got {other}"),
    }

    // The plan stage finished before cancellation; its record survives.
    assert_eq!(orchestrator.usage_tracker().len(), 1);
}

/// Mock wrapper that sleeps before delegating, to make cancellation land.
struct SlowProvider {
    inner: MockProvider,
    delay: Duration,
}

#[async_trait::async_trait]
impl relay_abstraction::Provider for SlowProvider {
    async fn invoke(
        &self,
        messages: &[relay_abstraction::ChatMessage],
    ) -> Result<relay_abstraction::ProviderResponse, relay_abstraction::ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.invoke(messages).await
    }

    fn provider(&self) -> ProviderKind {
        self.inner.provider()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
