//! TOML configuration file support for the orchestration core.
//!
//! Heuristic thresholds (quality scoring, recommendation ratios), the retry
//! policy, history capacities, and the analytics sink endpoint live in
//! configuration rather than as hard-coded constants. A missing file yields
//! defaults so a bare deployment keeps working.

use crate::routing::types::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt (transient errors only).
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff delay ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 200, max_delay_ms: 2000 }
    }
}

impl RetryConfig {
    /// Converts into the runtime retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Thresholds for the heuristic answer quality score.
///
/// The score is a rough signal, not a validated quality model; every
/// consumer surfaces it as heuristic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Score floor every answer starts from.
    pub base: f64,
    /// Maximum contribution of each individual signal.
    pub signal_weight: f64,
    /// Character count above which an answer earns half the length signal.
    pub short_answer_chars: usize,
    /// Character count above which an answer earns the full length signal.
    pub long_answer_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { base: 0.5, signal_weight: 0.1, short_answer_chars: 400, long_answer_chars: 1200 }
    }
}

/// Threshold rules for the comparison recommendation text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// A side is "meaningfully cheaper" when its cost <= other * ratio.
    pub cheaper_ratio: f64,
    /// A side is "meaningfully faster" when its latency <= other * ratio.
    pub faster_ratio: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { cheaper_ratio: 0.8, faster_ratio: 0.8 }
    }
}

/// In-memory history bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Usage record capacity.
    pub usage_capacity: usize,
    /// Accuracy record capacity.
    pub accuracy_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { usage_capacity: 10_000, accuracy_capacity: 10_000 }
    }
}

/// Analytics sink endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Base URL records are POSTed under (`{base}/usage`, `{base}/accuracy`).
    /// No forwarding when absent.
    pub base_url: Option<String>,
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Retry policy for transient provider errors.
    pub retry: RetryConfig,
    /// Quality score thresholds.
    pub quality: QualityConfig,
    /// Recommendation thresholds.
    pub recommendation: RecommendationConfig,
    /// History capacities.
    pub limits: LimitsConfig,
    /// Analytics sink endpoint.
    pub sink: SinkConfig,
    /// Optional pricing override file applied on top of the built-in table.
    pub pricing_overrides: Option<PathBuf>,
}

impl OrchestratorConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields defaults (backward compatible).
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality.base) {
            return Err(ConfigError::Validation(format!(
                "quality.base must be within [0.0, 1.0], got {}",
                self.quality.base
            )));
        }
        if self.quality.signal_weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "quality.signal_weight must be >= 0.0, got {}",
                self.quality.signal_weight
            )));
        }
        if self.quality.short_answer_chars >= self.quality.long_answer_chars {
            return Err(ConfigError::Validation(format!(
                "quality.short_answer_chars ({}) must be below quality.long_answer_chars ({})",
                self.quality.short_answer_chars, self.quality.long_answer_chars
            )));
        }
        for (name, ratio) in [
            ("recommendation.cheaper_ratio", self.recommendation.cheaper_ratio),
            ("recommendation.faster_ratio", self.recommendation.faster_ratio),
        ] {
            if !(0.0 < ratio && ratio <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within (0.0, 1.0], got {}",
                    name, ratio
                )));
            }
        }
        if self.limits.usage_capacity == 0 || self.limits.accuracy_capacity == 0 {
            return Err(ConfigError::Validation(
                "limits capacities must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
