//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level, directive, format or target could not be understood.
    #[error("invalid log configuration: {0}")]
    Config(String),

    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Init(String),

    /// The log file or its directory could not be created.
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
