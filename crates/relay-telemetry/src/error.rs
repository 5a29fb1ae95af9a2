// Error types for telemetry configuration and the analytics sink

use thiserror::Error;

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// I/O error reading a configuration file.
    #[error("Failed to read pricing configuration: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised by an analytics sink; always swallowed and logged by callers.
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP transport failure.
    #[error("sink transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("sink returned status {0}")]
    Status(u16),
}
