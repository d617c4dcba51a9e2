//! The CloudEvents attribute type system.
//!
//! Every context attribute and extension flows through [`Value`], a closed
//! sum over the CloudEvents primitive types. Each variant has a canonical
//! string form (its `Display`), and [`Value::parse`] reads that form back.
//!
//! | Kind          | Rust type            | Canonical form                   |
//! |---------------|----------------------|----------------------------------|
//! | Boolean       | `bool`               | `true` / `false`                 |
//! | Integer       | `i32`                | decimal                          |
//! | String        | `String`             | itself                           |
//! | Binary        | `Vec<u8>`            | standard base64                  |
//! | URI           | [`url::Url`]         | serialized URL                   |
//! | URI-reference | [`UriRef`]           | as written                       |
//! | Timestamp     | `DateTime<Utc>`      | RFC 3339, nanosecond precision   |
//!
//! Parsing the canonical form of a URI-reference as [`ValueKind::Uri`]
//! collapses it to a URI when the reference is absolute; a relative reference
//! cannot be parsed as a URI.

mod convert;
mod uri_ref;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

use crate::error::ValueResult;

pub use convert::{
    Candidate, IntoValue, format, integer_from_f64, integer_from_i64, integer_from_u64,
    parse_timestamp, to_binary, to_bool, to_integer, to_string, to_time, to_uri_ref, to_url,
    validate,
};
pub use uri_ref::UriRef;

/// The type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `true` or `false`.
    Boolean,
    /// 32-bit signed integer.
    Integer,
    /// Unicode string.
    String,
    /// Byte sequence.
    Binary,
    /// Absolute URI.
    Uri,
    /// URI-reference, possibly relative.
    UriRef,
    /// Point in time.
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Uri => "URI",
            Self::UriRef => "URI-reference",
            Self::Timestamp => "Timestamp",
        })
    }
}

/// A validated CloudEvents attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// 32-bit signed integer.
    Integer(i32),
    /// String value.
    String(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Absolute URI.
    Uri(Url),
    /// URI-reference.
    UriRef(UriRef),
    /// Timestamp in UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::String(_) => ValueKind::String,
            Self::Binary(_) => ValueKind::Binary,
            Self::Uri(_) => ValueKind::Uri,
            Self::UriRef(_) => ValueKind::UriRef,
            Self::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Parse the canonical string form of a value of type `kind`.
    ///
    /// # Errors
    ///
    /// Returns the conversion error for `kind` when `input` is not a valid
    /// canonical form.
    pub fn parse(kind: ValueKind, input: &str) -> ValueResult<Self> {
        let s = Value::String(input.to_owned());
        Ok(match kind {
            ValueKind::Boolean => Self::Boolean(to_bool(&s)?),
            ValueKind::Integer => Self::Integer(to_integer(s)?),
            ValueKind::String => s,
            ValueKind::Binary => Self::Binary(to_binary(&s)?),
            ValueKind::Uri => Self::Uri(to_url(&s)?),
            ValueKind::UriRef => Self::UriRef(to_uri_ref(&s)?),
            ValueKind::Timestamp => Self::Timestamp(to_time(&s)?),
        })
    }

    /// Borrow the string payload of a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload of a [`Value::Boolean`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload of a [`Value::Integer`].
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Binary(b) => f.write_str(&STANDARD.encode(b)),
            Self::Uri(u) => f.write_str(u.as_str()),
            Self::UriRef(u) => f.write_str(u.as_str()),
            Self::Timestamp(t) => f.write_str(&format_timestamp(t)),
        }
    }
}

/// RFC 3339 with as many fractional digits as needed, always `Z`.
#[must_use]
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<Url> for Value {
    fn from(v: Url) -> Self {
        Self::Uri(v)
    }
}

impl From<UriRef> for Value {
    fn from(v: UriRef) -> Self {
        Self::UriRef(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn samples() -> Vec<Value> {
        vec![
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Integer(-42),
            Value::Integer(i32::MAX),
            Value::String("hello world".into()),
            Value::Binary(vec![0, 1, 2, 250, 255]),
            Value::Uri(Url::parse("https://example.com/a?b=c").unwrap()),
            Value::UriRef(UriRef::parse("/relative/path").unwrap()),
            Value::Timestamp(
                Utc.with_ymd_and_hms(2020, 3, 21, 12, 34, 56)
                    .unwrap()
                    .with_nanosecond(123_456_789)
                    .unwrap(),
            ),
        ]
    }

    #[test]
    fn test_canonical_form_parses_back() {
        for v in samples() {
            let text = v.to_string();
            assert_eq!(Value::parse(v.kind(), &text).unwrap(), v, "{text}");
        }
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Binary(b"hello".to_vec()).to_string(), "aGVsbG8=");
        let t = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::Timestamp(t).to_string(), "2021-01-02T03:04:05Z");
    }

    #[test]
    fn test_uri_ref_collapses_to_uri_when_absolute() {
        let r = Value::UriRef(UriRef::parse("http://example.com/x").unwrap());
        let parsed = Value::parse(ValueKind::Uri, &r.to_string()).unwrap();
        assert_eq!(parsed.kind(), ValueKind::Uri);
        assert!(Value::parse(ValueKind::Uri, "/relative").is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::UriRef.to_string(), "URI-reference");
        assert_eq!(ValueKind::Uri.to_string(), "URI");
    }
}
