//! Per-model pricing table and cost estimation.

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Per-million-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Price per 1M input tokens, USD.
    pub input_per_million: f64,
    /// Price per 1M output tokens, USD.
    pub output_per_million: f64,
}

/// Heuristic token estimate: roughly 4 characters per token for English text.
///
/// Intentionally crude - not a real tokenizer. `""` estimates to 0.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    text.len().div_ceil(4) as u32
}

/// Rounds a cost to 4 decimal places.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// TOML structure for pricing overrides.
#[derive(Debug, Clone, Deserialize)]
struct PricingConfigToml {
    #[serde(default)]
    models: HashMap<String, CostEntry>,
}

/// Static model-id → price table, immutable at runtime.
///
/// Unknown models price to 0 with a warning; that is a gap in the table, not
/// an error, and never blocks usage tracking.
#[derive(Debug, Clone)]
pub struct PricingTable {
    entries: HashMap<String, CostEntry>,
}

impl PricingTable {
    /// Built-in catalog covering the routed model set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();

        // OpenAI
        entries.insert(
            "gpt-4o".to_string(),
            CostEntry { input_per_million: 2.5, output_per_million: 10.0 },
        );
        entries.insert(
            "gpt-4o-mini".to_string(),
            CostEntry { input_per_million: 0.15, output_per_million: 0.6 },
        );
        entries.insert(
            "o1".to_string(),
            CostEntry { input_per_million: 15.0, output_per_million: 60.0 },
        );

        // Gemini
        entries.insert(
            "gemini-2.0-flash".to_string(),
            CostEntry { input_per_million: 0.1, output_per_million: 0.4 },
        );
        entries.insert(
            "gemini-1.5-pro".to_string(),
            CostEntry { input_per_million: 1.25, output_per_million: 5.0 },
        );

        // Perplexity
        entries.insert(
            "sonar".to_string(),
            CostEntry { input_per_million: 1.0, output_per_million: 1.0 },
        );
        entries.insert(
            "sonar-pro".to_string(),
            CostEntry { input_per_million: 3.0, output_per_million: 15.0 },
        );

        Self { entries }
    }

    /// Loads the built-in catalog with overrides from a TOML file.
    ///
    /// A missing file yields the plain built-in catalog (backward compatible).
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut table = Self::builtin();

        if !path.exists() {
            return Ok(table);
        }

        let content = std::fs::read_to_string(path)?;
        let config: PricingConfigToml = toml::from_str(&content)?;

        for (model, entry) in &config.models {
            if entry.input_per_million < 0.0 || entry.output_per_million < 0.0 {
                return Err(TelemetryError::Validation(format!(
                    "Invalid pricing for model '{}': prices must be >= 0.0",
                    model
                )));
            }
        }

        for (model, entry) in config.models {
            debug!(model = %model, "Applying pricing override");
            table.entries.insert(model, entry);
        }

        Ok(table)
    }

    /// Looks up the pricing entry for a model.
    #[must_use]
    pub fn entry(&self, model: &str) -> Option<&CostEntry> {
        self.entries.get(model)
    }

    /// Computes the cost of one invocation, rounded to 4 decimal places.
    ///
    /// Unknown models cost 0 and emit one warning per call.
    #[must_use]
    pub fn cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let Some(entry) = self.entries.get(model) else {
            warn!(model = %model, "No pricing entry for model, recording zero cost");
            return 0.0;
        };

        let raw = (f64::from(input_tokens) / 1_000_000.0) * entry.input_per_million
            + (f64::from(output_tokens) / 1_000_000.0) * entry.output_per_million;
        round4(raw)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}
