// Error types for orchestration

use crate::config::ConfigError;
use relay_abstraction::{ProviderError, ProviderKind};
use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Provider invocation error; propagates unmodified to the caller
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The routing decision resolved to a handle nobody registered
    #[error("No provider registered for {provider}:{model}")]
    ProviderNotRegistered {
        /// Provider family of the decision
        provider: ProviderKind,
        /// Model id of the decision
        model: String,
    },

    /// A research pipeline stage failed; remaining stages were aborted
    #[error("Research stage '{stage}' failed: {source}")]
    Stage {
        /// Stage label ("plan", "research", "synthesize")
        stage: &'static str,
        /// The underlying failure
        #[source]
        source: Box<OrchestratorError>,
    },

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
