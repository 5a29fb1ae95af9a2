//! Analytics sink boundary.
//!
//! Telemetry records are forwarded to an external analytics service as
//! fire-and-forget JSON POSTs. Forwarding is best-effort: failures are
//! logged by the trackers and never surface to the caller, since the
//! in-memory record is the source of truth for the process lifetime.

use crate::error::SinkError;
use crate::metrics::{AccuracyMetric, UsageMetric};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// One-way telemetry emission capability.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Forwards one usage record.
    ///
    /// # Errors
    /// Returns a `SinkError` on transport or status failure; callers swallow it.
    async fn record_usage(&self, metric: &UsageMetric) -> Result<(), SinkError>;

    /// Forwards one accuracy record.
    ///
    /// # Errors
    /// Returns a `SinkError` on transport or status failure; callers swallow it.
    async fn record_accuracy(&self, metric: &AccuracyMetric) -> Result<(), SinkError>;
}

/// HTTP sink posting JSON records to `{base}/usage` and `{base}/accuracy`.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    base_url: String,
}

impl HttpSink {
    /// Creates a sink targeting the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client: Client::new(), base_url }
    }

    async fn post<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), SinkError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }
        debug!(url = %url, "Forwarded telemetry record");
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for HttpSink {
    async fn record_usage(&self, metric: &UsageMetric) -> Result<(), SinkError> {
        self.post("usage", metric).await
    }

    async fn record_accuracy(&self, metric: &AccuracyMetric) -> Result<(), SinkError> {
        self.post("accuracy", metric).await
    }
}

/// A sink that drops every record. Default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl AnalyticsSink for NoopSink {
    async fn record_usage(&self, _metric: &UsageMetric) -> Result<(), SinkError> {
        Ok(())
    }

    async fn record_accuracy(&self, _metric: &AccuracyMetric) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_abstraction::{Complexity, ProviderKind};

    fn sample_usage() -> UsageMetric {
        UsageMetric {
            provider: ProviderKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            task_type: "simple-chat".to_string(),
            query_complexity: Complexity::Low,
            input_tokens: 5,
            output_tokens: 7,
            total_tokens: 12,
            cost: 0.0,
            response_time_ms: 300,
            timestamp: Utc::now(),
            chat_id: None,
            user_id: None,
            query: "hi".to_string(),
            response: "hello".to_string(),
            sources: None,
            web_search_used: false,
            rag_used: false,
        }
    }

    #[tokio::test]
    async fn test_http_sink_posts_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/usage")
            .match_header("content-type", "application/json")
            .with_status(202)
            .create_async()
            .await;

        let sink = HttpSink::new(server.url());
        sink.record_usage(&sample_usage()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_sink_surfaces_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/usage").with_status(503).create_async().await;

        let sink = HttpSink::new(format!("{}/", server.url()));
        let err = sink.record_usage(&sample_usage()).await.unwrap_err();
        assert!(matches!(err, SinkError::Status(503)));
    }

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoopSink;
        assert!(sink.record_usage(&sample_usage()).await.is_ok());
    }
}
