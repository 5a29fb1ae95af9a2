//! Model router: evaluates the priority table, invokes the selected
//! provider, and records usage for every call.

use super::rules::{DEFAULT_RULES, RouteSignals, RoutingRule, catalog};
use super::types::{
    CallContext, CallMetadata, CallUsage, RetryPolicy, RouteOptions, RoutingDecision,
    TrackedResponse,
};
use crate::error::{OrchestratorError, Result};
use rand::Rng;
use relay_abstraction::{ChatMessage, Complexity, Provider, ProviderKind, ProviderResponse, TaskType};
use relay_models::ProviderRegistry;
use relay_telemetry::{TrackOptions, UsageTracker, estimate_tokens};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Routes each call to a concrete provider+model and tracks its usage.
///
/// Routing is deterministic: identical `(task_type, complexity, options)`
/// always select the same provider and model. Failure semantics: transient
/// provider errors get a bounded jittered retry, everything else propagates
/// unmodified - fallback to a degraded path belongs to the caller.
pub struct ModelRouter {
    /// Ordered decision table, first match wins.
    rules: &'static [RoutingRule],
    /// Invocable handles for the catalog.
    registry: Arc<ProviderRegistry>,
    /// Usage telemetry, injected once at process start.
    usage: Arc<UsageTracker>,
    /// Retry policy for transient errors.
    retry: RetryPolicy,
}

impl ModelRouter {
    /// Creates a router over the default rule table.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, usage: Arc<UsageTracker>) -> Self {
        Self { rules: DEFAULT_RULES, registry, usage, retry: RetryPolicy::default() }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Access to the usage tracker this router records into.
    #[must_use]
    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    /// Evaluates the priority table and returns the decision.
    ///
    /// Pure and deterministic; no provider is invoked.
    #[must_use]
    pub fn route(
        &self,
        task_type: TaskType,
        complexity: Complexity,
        options: &RouteOptions,
    ) -> RoutingDecision {
        let signals = RouteSignals::new(task_type, complexity, options);

        for rule in self.rules {
            if (rule.applies)(&signals) {
                let (provider, model) = (rule.decide)(&signals);
                debug!(
                    rule = rule.name,
                    provider = %provider,
                    model = model,
                    task_type = %task_type,
                    complexity = %complexity,
                    "Routing decision made"
                );
                return RoutingDecision { provider, model: model.to_string(), rule: rule.name };
            }
        }

        // The table ends with a catch-all; reaching here means it was edited out.
        warn!("Routing table had no matching rule, falling back to capable default");
        RoutingDecision {
            provider: ProviderKind::OpenAi,
            model: catalog::GPT_DEFAULT.to_string(),
            rule: "fallback",
        }
    }

    /// Routes, invokes the provider with the query as a single user message,
    /// and records one usage metric for the call.
    ///
    /// Token counts prefer the provider's self-reported usage and fall back
    /// to the character heuristic. Identity on the returned metadata comes
    /// from the provider's tagged response, not the routing decision.
    ///
    /// # Errors
    /// Propagates provider errors unmodified (after bounded transient retry);
    /// no fallback routing happens at this layer.
    pub async fn route_and_track(
        &self,
        task_type: TaskType,
        query: &str,
        complexity: Complexity,
        options: &RouteOptions,
        ctx: &CallContext,
    ) -> Result<TrackedResponse> {
        let decision = self.route(task_type, complexity, options);
        let provider = self.registry.get(decision.provider, &decision.model).ok_or_else(|| {
            OrchestratorError::ProviderNotRegistered {
                provider: decision.provider,
                model: decision.model.clone(),
            }
        })?;

        let messages = [ChatMessage::user(query)];
        let started = Instant::now();
        let response = self.invoke_with_policy(provider.as_ref(), &messages, ctx).await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (input_tokens, output_tokens) = match response.usage {
            Some(usage) => (usage.input_tokens, usage.output_tokens),
            None => (estimate_tokens(query), estimate_tokens(&response.content)),
        };

        let metric = self.usage.track_usage(
            response.provider,
            &response.model_id,
            task_type,
            complexity,
            input_tokens,
            output_tokens,
            response_time_ms,
            query,
            &response.content,
            TrackOptions {
                chat_id: options.chat_id.clone(),
                user_id: options.user_id.clone(),
                sources: None,
                web_search_used: options.requires_web_search,
                rag_used: options.rag_used,
            },
        );

        info!(
            rule = decision.rule,
            provider = %response.provider,
            model = %response.model_id,
            total_tokens = metric.total_tokens,
            cost = metric.cost,
            response_time_ms = response_time_ms,
            "Routed call completed"
        );

        Ok(TrackedResponse {
            content: response.content,
            usage: CallUsage {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                cost: metric.cost,
                response_time_ms,
            },
            metadata: CallMetadata {
                provider: metric.provider,
                model: metric.model,
                task_type,
                complexity,
                timestamp: metric.timestamp,
            },
        })
    }

    /// Invokes a provider under the cancellation token, deadline, and
    /// transient-retry policy.
    async fn invoke_with_policy(
        &self,
        provider: &dyn Provider,
        messages: &[ChatMessage],
        ctx: &CallContext,
    ) -> Result<ProviderResponse> {
        let mut attempt: u32 = 0;

        loop {
            if ctx.cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            let invocation = provider.invoke(messages);
            let outcome = if let Some(limit) = ctx.timeout {
                tokio::select! {
                    () = ctx.cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                    result = tokio::time::timeout(limit, invocation) => match result {
                        Ok(inner) => inner,
                        Err(_) => Err(relay_abstraction::ProviderError::Timeout {
                            provider: provider.provider().to_string(),
                            elapsed_ms: limit.as_millis() as u64,
                        }),
                    },
                }
            } else {
                tokio::select! {
                    () = ctx.cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                    result = invocation => result,
                }
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient provider error, retrying"
                    );
                    tokio::select! {
                        () = ctx.cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(OrchestratorError::Provider(e)),
            }
        }
    }

    /// Exponential backoff with jitter of up to half the step.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let step = self
            .retry
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.retry.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=step.as_millis() as u64 / 2);
        step + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::PrivacyLevel;
    use super::*;
    use relay_abstraction::ProviderError;
    use relay_models::MockProvider;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn mock_router() -> ModelRouter {
        let registry = Arc::new(ProviderRegistry::with_mocks(catalog::ALL));
        let usage = Arc::new(UsageTracker::new());
        ModelRouter::new(registry, usage).with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        })
    }

    #[test]
    fn test_route_is_deterministic() {
        let router = mock_router();
        let options = RouteOptions { requires_web_search: true, ..RouteOptions::default() };
        let first = router.route(TaskType::Research, Complexity::High, &options);
        let second = router.route(TaskType::Research, Complexity::High, &options);
        assert_eq!(first, second);
        assert_eq!(first.provider, ProviderKind::Perplexity);
        assert_eq!(first.model, catalog::SONAR_PRO);
    }

    #[test]
    fn test_route_priority_with_conflicting_options() {
        let router = mock_router();
        let all_set = RouteOptions {
            force_gpt: true,
            privacy_level: PrivacyLevel::Private,
            requires_web_search: true,
            ..RouteOptions::default()
        };
        let decision = router.route(TaskType::SimpleChat, Complexity::Low, &all_set);
        assert_eq!(decision.rule, "force-gpt");
        assert_eq!(decision.provider, ProviderKind::OpenAi);

        let without_force = RouteOptions { force_gpt: false, ..all_set.clone() };
        let decision = router.route(TaskType::SimpleChat, Complexity::Low, &without_force);
        assert_eq!(decision.rule, "privacy");

        let web_only = RouteOptions { privacy_level: PrivacyLevel::Standard, ..without_force };
        let decision = router.route(TaskType::SimpleChat, Complexity::Low, &web_only);
        assert_eq!(decision.rule, "web-search");
    }

    #[tokio::test]
    async fn test_route_and_track_records_usage() {
        let router = mock_router();
        let ctx = CallContext::default();

        let response = router
            .route_and_track(
                TaskType::Research,
                "What are the latest trends in AI?",
                Complexity::Low,
                &RouteOptions::default(),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(response.metadata.provider, ProviderKind::OpenAi);
        assert_eq!(response.metadata.model, catalog::GPT_DEFAULT);
        assert_eq!(
            response.usage.total_tokens,
            response.usage.input_tokens + response.usage.output_tokens
        );

        let history = router.usage().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].provider, ProviderKind::OpenAi);
        assert_eq!(history[0].total_tokens, history[0].input_tokens + history[0].output_tokens);
    }

    #[tokio::test]
    async fn test_route_and_track_prefers_reported_usage() {
        let registry = Arc::new(ProviderRegistry::new());
        registry.register(Arc::new(
            MockProvider::new(ProviderKind::Gemini, catalog::GEMINI_FAST.to_string())
                .with_usage(111, 222),
        ));
        let router = ModelRouter::new(registry, Arc::new(UsageTracker::new()));

        let response = router
            .route_and_track(
                TaskType::SimpleChat,
                "hi",
                Complexity::Low,
                &RouteOptions::default(),
                &CallContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.usage.input_tokens, 111);
        assert_eq!(response.usage.output_tokens, 222);
        assert_eq!(response.usage.total_tokens, 333);
    }

    #[tokio::test]
    async fn test_transient_errors_retried_then_succeed() {
        let registry = Arc::new(ProviderRegistry::new());
        let provider = Arc::new(
            MockProvider::new(ProviderKind::OpenAi, catalog::GPT_DEFAULT.to_string()).fail_first(
                2,
                ProviderError::RateLimited { provider: "openai".to_string(), message: None },
            ),
        );
        registry.register(provider.clone());
        let router = ModelRouter::new(registry, Arc::new(UsageTracker::new()))
            .with_retry_policy(RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            });

        let options = RouteOptions { force_gpt: true, ..RouteOptions::default() };
        let result = router
            .route_and_track(
                TaskType::SimpleChat,
                "retry me",
                Complexity::Low,
                &options,
                &CallContext::default(),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(provider.calls(), 3);
        assert_eq!(router.usage().len(), 1);
    }

    #[tokio::test]
    async fn test_non_transient_error_propagates_without_retry() {
        let registry = Arc::new(ProviderRegistry::new());
        let provider = Arc::new(
            MockProvider::new(ProviderKind::OpenAi, catalog::GPT_DEFAULT.to_string())
                .failing(ProviderError::ResponseError("bad request".to_string())),
        );
        registry.register(provider.clone());
        let router = ModelRouter::new(registry, Arc::new(UsageTracker::new()));

        let options = RouteOptions { force_gpt: true, ..RouteOptions::default() };
        let err = router
            .route_and_track(
                TaskType::SimpleChat,
                "fail me",
                Complexity::Low,
                &options,
                &CallContext::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Provider(ProviderError::ResponseError(_))
        ));
        assert_eq!(provider.calls(), 1);
        // Failed invocations record nothing.
        assert!(router.usage().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_context_aborts() {
        let router = mock_router();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = CallContext { cancel, timeout: None };

        let err = router
            .route_and_track(
                TaskType::SimpleChat,
                "never runs",
                Complexity::Low,
                &RouteOptions::default(),
                &ctx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Cancelled));
        assert!(router.usage().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_model_is_an_error() {
        let registry = Arc::new(ProviderRegistry::new());
        let router = ModelRouter::new(registry, Arc::new(UsageTracker::new()));

        let err = router
            .route_and_track(
                TaskType::SimpleChat,
                "hello",
                Complexity::Low,
                &RouteOptions::default(),
                &CallContext::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::ProviderNotRegistered { .. }));
    }
}
