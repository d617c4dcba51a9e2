//! Error types for message routing.

use herald_core::{EventError, ValidationError, ValueError};
use herald_format::FormatError;
use thiserror::Error;

/// Boxed error returned by transports.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading, transforming or writing messages.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The encoding of a message could not be determined, or no writer
    /// accepts it.
    #[error("unknown encoding")]
    UnknownEncoding,

    /// `read_structured` was called on a message that is not structured.
    #[error("message is not in structured mode")]
    NotStructured,

    /// `read_binary` was called on a message that is not binary.
    #[error("message is not in binary mode")]
    NotBinary,

    /// Routing configuration is unusable.
    #[error("invalid binding configuration: {0}")]
    Config(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// A transformer was asked to run in a mode it does not support.
    #[error("transformer {name} does not support {mode} mode")]
    Affinity {
        /// Transformer name.
        name: String,
        /// The requested mode.
        mode: &'static str,
    },

    /// A header could not be read.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Failure inside a transport-supplied message or writer.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Structured format failure.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Event construction failure.
    #[error(transparent)]
    Event(#[from] EventError),

    /// Attribute value conversion failure.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// The event failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl BindingError {
    /// Wrap a transport error.
    pub fn transport(error: impl Into<TransportError>) -> Self {
        Self::Transport(error.into())
    }

    /// Whether this is [`BindingError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;
