//! Error types for the event model.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::spec_version::SpecVersion;
use crate::value::ValueKind;

/// Errors raised while validating or converting attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The input has no CloudEvents representation.
    #[error("invalid CloudEvents value: {0}")]
    InvalidValue(String),

    /// A numeric value does not fit in a 32-bit signed integer.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A string could not be parsed into the requested type.
    #[error("invalid syntax for {kind}: {input:?}")]
    InvalidSyntax {
        /// The type the input was parsed as.
        kind: ValueKind,
        /// The rejected input.
        input: String,
    },

    /// A timestamp string is not RFC 3339.
    #[error("not in RFC 3339 format: {0:?}")]
    NotRfc3339(String),

    /// A binary value is not valid standard base64.
    #[error("illegal base64 data: {0}")]
    IllegalBase64(String),

    /// A URI or URI-reference failed to parse.
    #[error("invalid URI {input:?}: {reason}")]
    InvalidUri {
        /// The rejected input.
        input: String,
        /// Parser message.
        reason: String,
    },

    /// A URI-reference was supplied where an absolute URI is required.
    #[error("URI is not absolute: {0:?}")]
    NotAbsolute(String),

    /// The value cannot be coerced into the requested type.
    #[error("cannot convert {from} to {to}")]
    CannotConvert {
        /// Source type.
        from: ValueKind,
        /// Requested type.
        to: ValueKind,
    },
}

/// Why a single context field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A required attribute is absent or blank.
    #[error("REQUIRED but MISSING")]
    Missing,

    /// The attribute value is not valid for its type.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// The attribute violates a spec rule other than its type.
    #[error("{0}")]
    Invalid(String),
}

/// Accumulated per-field validation failures.
///
/// Produced both by deferred setter failures on an [`Event`](crate::Event)
/// and by context validation. Holds one entry per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<String, FieldError>,
}

impl ValidationError {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`, replacing any previous cause.
    pub fn insert(&mut self, field: impl Into<String>, error: impl Into<FieldError>) {
        self.fields.insert(field.into(), error.into());
    }

    /// Clear the failure recorded for `field`.
    pub fn remove(&mut self, field: &str) -> Option<FieldError> {
        self.fields.remove(field)
    }

    /// Merge another error set into this one. Entries already present win.
    pub fn merge(&mut self, other: ValidationError) {
        for (field, error) in other.fields {
            self.fields.entry(field).or_insert(error);
        }
    }

    /// Cause recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.fields.get(field)
    }

    /// Whether the field has a recorded failure.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate `(field, cause)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the error set itself when it holds at least one failure.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        let mut sep = ": ";
        for (field, error) in &self.fields {
            write!(f, "{sep}{field}: {error}")?;
            sep = "; ";
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised by payload data codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No codec is registered for the content type.
    #[error("unsupported content type: {0:?}")]
    UnsupportedContentType(String),

    /// The codec cannot handle this kind of value.
    #[error("{content_type} codec cannot handle {what}")]
    UnsupportedValue {
        /// Content type of the codec.
        content_type: String,
        /// Description of the rejected value.
        what: &'static str,
    },

    /// Encoding the payload failed.
    #[error("{content_type} encode failed: {source}")]
    Encode {
        /// Content type of the codec.
        content_type: String,
        /// Underlying codec error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Decoding the payload failed.
    #[error("{content_type} decode failed: {source}")]
    Decode {
        /// Content type of the codec.
        content_type: String,
        /// Underlying codec error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CodecError {
    /// Wrap an encoder failure with its content type.
    pub fn encode(
        content_type: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Encode {
            content_type: content_type.into(),
            source: source.into(),
        }
    }

    /// Wrap a decoder failure with its content type.
    pub fn decode(
        content_type: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Decode {
            content_type: content_type.into(),
            source: source.into(),
        }
    }
}

/// Umbrella error for event operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A value conversion failed.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A payload codec failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The event carries no data.
    #[error("event has no data")]
    NoData,

    /// The spec version string is not supported.
    #[error("unsupported spec version: {0:?}")]
    UnknownSpecVersion(String),

    /// An extension name contains characters outside `[A-Za-z0-9]`.
    #[error("invalid extension name {0:?}: must match [a-z0-9]+")]
    InvalidExtensionName(String),

    /// An extension would shadow an attribute defined by the spec version.
    #[error("bad key {name:?}: spec attribute of {version} must not be overwritten by an extension")]
    ReservedExtensionName {
        /// Lowercased extension name.
        name: String,
        /// Version reserving the name.
        version: SpecVersion,
    },

    /// A `traceparent` value is not in W3C trace-context form.
    #[error("invalid traceparent {0:?}")]
    InvalidTraceParent(String),
}

impl From<EventError> for FieldError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Value(v) => Self::Value(v),
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// Result type for payload codecs.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for value operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_lists_fields() {
        let mut err = ValidationError::new();
        err.insert("id", FieldError::Missing);
        err.insert("source", FieldError::Invalid("bad".into()));
        assert_eq!(
            err.to_string(),
            "validation failed: id: REQUIRED but MISSING; source: bad"
        );
    }

    #[test]
    fn test_validation_error_merge_keeps_existing() {
        let mut a = ValidationError::new();
        a.insert("id", FieldError::Missing);
        let mut b = ValidationError::new();
        b.insert("id", FieldError::Invalid("other".into()));
        b.insert("type", FieldError::Missing);
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get("id"), Some(&FieldError::Missing));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationError::new().into_result().is_ok());
        let mut err = ValidationError::new();
        err.insert("id", FieldError::Missing);
        assert!(err.into_result().is_err());
    }

    #[test]
    fn test_value_error_display() {
        let err = ValueError::OutOfRange("2147483648".into());
        assert_eq!(err.to_string(), "value out of range: 2147483648");
        let err = ValueError::InvalidValue("null".into());
        assert_eq!(err.to_string(), "invalid CloudEvents value: null");
    }
}
