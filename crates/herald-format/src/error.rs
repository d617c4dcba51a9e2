//! Error types for structured formats.

use herald_core::{EventError, ValidationError, ValueError};
use thiserror::Error;

/// Errors raised while marshalling or unmarshalling structured events.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Malformed JSON, or JSON of the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed protobuf.
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// The event has no `specversion`.
    #[error("specversion: REQUIRED but MISSING")]
    MissingSpecVersion,

    /// An attribute that may appear at most once appeared again.
    #[error("duplicate attribute {0:?}")]
    DuplicateAttribute(String),

    /// An attribute has the wrong JSON type.
    #[error("attribute {name:?} must be {expected}")]
    WrongType {
        /// Attribute name.
        name: String,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// `datacontentencoding` is not `base64`.
    #[error("datacontentencoding must be \"base64\", got {0:?}")]
    IllegalEncoding(String),

    /// Both `data` and `data_base64` are present.
    #[error("only one of data and data_base64 may be present")]
    DataConflict,

    /// The `data_base64` payload is not valid base64.
    #[error("data_base64 is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A protobuf timestamp is outside the representable range.
    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp {
        /// Seconds since the Unix epoch.
        seconds: i64,
        /// Nanosecond fraction.
        nanos: i32,
    },

    /// No format is registered for the media type.
    #[error("unknown event format {0:?}")]
    UnknownMediaType(String),

    /// A batch holds a number of events other than one.
    #[error("expected exactly one event in batch, found {0}")]
    BatchSize(usize),

    /// The event failed validation before marshalling.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An attribute value failed to convert.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// An event operation failed.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;
