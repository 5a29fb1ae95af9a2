//! Head-to-head provider comparison.
//!
//! Runs the full research pipeline once pinned to the capable family and
//! once pinned to the alternate, under distinct correlation ids, then scores
//! the answers with a rough heuristic and recommends by cost/speed
//! thresholds. The scores are signals, not a validated quality model, and
//! are flagged as heuristic in the output.

use super::{PipelinePin, ResearchConfig, ResearchOrchestrator, ResearchResult};
use crate::config::{QualityConfig, RecommendationConfig};
use crate::error::Result;
use crate::routing::CallContext;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// The outcome of a two-provider comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderComparison {
    /// Pipeline result pinned to the capable family.
    pub capable: ResearchResult,
    /// Pipeline result pinned to the alternate family.
    pub alternate: ResearchResult,
    /// Deltas, scores, and the recommendation.
    pub comparison: ComparisonSummary,
}

/// Deltas and heuristic scores for a comparison run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// capable cost minus alternate cost.
    pub cost_delta: f64,
    /// capable latency minus alternate latency.
    pub response_time_delta_ms: i64,
    /// Heuristic quality score for the capable answer.
    pub quality_capable: f64,
    /// Heuristic quality score for the alternate answer.
    pub quality_alternate: f64,
    /// Threshold-rule recommendation referencing the measured deltas.
    pub recommendation: String,
    /// Always "heuristic": the scores are rough signals, not ground truth.
    pub basis: &'static str,
}

impl ResearchOrchestrator {
    /// Runs the pipeline against both provider families and compares them.
    ///
    /// The two runs are logically independent and execute concurrently, each
    /// under its own correlation id.
    ///
    /// # Errors
    /// Either pipeline's stage failure propagates; there is no partial
    /// comparison.
    pub async fn compare_providers(
        &self,
        query: &str,
        config: &ResearchConfig,
        ctx: &CallContext,
    ) -> Result<ProviderComparison> {
        let capable_id = Uuid::new_v4().to_string();
        let alternate_id = Uuid::new_v4().to_string();

        let (capable, alternate) = tokio::join!(
            self.run_pipeline(query, config, ctx, PipelinePin::Capable, capable_id),
            self.run_pipeline(query, config, ctx, PipelinePin::Alternate, alternate_id),
        );
        let capable = capable?;
        let alternate = alternate?;

        let quality_capable = quality_score(&capable.answer, &self.quality);
        let quality_alternate = quality_score(&alternate.answer, &self.quality);
        let recommendation = recommend(
            (capable.usage.total_cost, alternate.usage.total_cost),
            (capable.usage.total_response_time_ms, alternate.usage.total_response_time_ms),
            &self.recommendation,
        );

        info!(
            cost_capable = capable.usage.total_cost,
            cost_alternate = alternate.usage.total_cost,
            quality_capable = quality_capable,
            quality_alternate = quality_alternate,
            "Provider comparison completed"
        );

        let comparison = ComparisonSummary {
            cost_delta: capable.usage.total_cost - alternate.usage.total_cost,
            response_time_delta_ms: capable.usage.total_response_time_ms as i64
                - alternate.usage.total_response_time_ms as i64,
            quality_capable,
            quality_alternate,
            recommendation,
            basis: "heuristic",
        };

        Ok(ProviderComparison { capable, alternate, comparison })
    }
}

fn has_structural_markup(answer: &str) -> bool {
    answer.contains("##")
        || answer.contains("\n- ")
        || answer.contains("\n* ")
        || answer.contains("\n1.")
        || answer.contains("**")
}

fn has_numeric_data(answer: &str) -> bool {
    answer.bytes().any(|b| b.is_ascii_digit())
}

fn has_source_markers(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    lower.contains("http") || lower.contains("source") || lower.contains("reference")
}

/// Heuristic answer quality: base score plus up to one signal weight each
/// for length, structural markup, numeric data, and source markers, capped
/// at 1.0.
#[must_use]
pub fn quality_score(answer: &str, config: &QualityConfig) -> f64 {
    let mut score = config.base;
    let length = answer.chars().count();

    if length >= config.long_answer_chars {
        score += config.signal_weight;
    } else if length >= config.short_answer_chars {
        score += config.signal_weight / 2.0;
    }
    if has_structural_markup(answer) {
        score += config.signal_weight;
    }
    if has_numeric_data(answer) {
        score += config.signal_weight;
    }
    if has_source_markers(answer) {
        score += config.signal_weight;
    }

    score.min(1.0)
}

/// Threshold-rule recommendation over `(capable, alternate)` cost and latency.
#[must_use]
pub fn recommend(
    cost: (f64, f64),
    response_time_ms: (u64, u64),
    config: &RecommendationConfig,
) -> String {
    let (cost_capable, cost_alternate) = cost;
    let (time_capable, time_alternate) = response_time_ms;

    let alternate_cheaper = cost_alternate <= cost_capable * config.cheaper_ratio;
    let alternate_faster =
        time_alternate as f64 <= time_capable as f64 * config.faster_ratio;
    let capable_cheaper = cost_capable <= cost_alternate * config.cheaper_ratio;
    let capable_faster = time_capable as f64 <= time_alternate as f64 * config.faster_ratio;

    if alternate_cheaper && alternate_faster {
        format!(
            "Alternate provider recommended: ${:.4} cheaper and {}ms faster for this run",
            cost_capable - cost_alternate,
            time_capable.saturating_sub(time_alternate)
        )
    } else if capable_cheaper && capable_faster {
        format!(
            "Capable provider recommended: ${:.4} cheaper and {}ms faster for this run",
            cost_alternate - cost_capable,
            time_alternate.saturating_sub(time_capable)
        )
    } else {
        format!(
            "Comparable, choose by requirement (cost delta ${:.4}, latency delta {}ms)",
            cost_capable - cost_alternate,
            time_capable as i64 - time_alternate as i64
        )
    }
}
