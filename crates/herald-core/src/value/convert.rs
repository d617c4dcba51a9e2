//! Validation and coercion into CloudEvents values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, Utc};
use url::Url;

use super::{UriRef, Value, ValueKind};
use crate::error::{ValueError, ValueResult};

/// An input awaiting validation.
///
/// Native integers and floats are kept at full width until the caller
/// decides how to narrow them: [`validate`] rejects non-integral floats,
/// while [`to_integer`] truncates them toward zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Already a CloudEvents value.
    Value(Value),
    /// Signed integer of any width.
    Signed(i64),
    /// Unsigned integer of any width.
    Unsigned(u64),
    /// Floating point number.
    Float(f64),
    /// Something with no CloudEvents representation.
    Invalid(String),
}

/// Types that can be offered to the CloudEvents type system.
pub trait IntoValue {
    /// Describe `self` as a [`Candidate`].
    fn into_candidate(self) -> Candidate;
}

impl IntoValue for Candidate {
    fn into_candidate(self) -> Candidate {
        self
    }
}

impl IntoValue for Value {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(self)
    }
}

impl IntoValue for &Value {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(self.clone())
    }
}

impl IntoValue for bool {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Boolean(self))
    }
}

macro_rules! signed_into_value {
    ($($t:ty),*) => {$(
        impl IntoValue for $t {
            fn into_candidate(self) -> Candidate {
                Candidate::Signed(i64::from(self))
            }
        }
    )*};
}

macro_rules! unsigned_into_value {
    ($($t:ty),*) => {$(
        impl IntoValue for $t {
            fn into_candidate(self) -> Candidate {
                Candidate::Unsigned(u64::from(self))
            }
        }
    )*};
}

signed_into_value!(i8, i16, i32, i64);
unsigned_into_value!(u8, u16, u32, u64);

impl IntoValue for isize {
    fn into_candidate(self) -> Candidate {
        i64::try_from(self).map_or_else(|_| Candidate::Invalid(self.to_string()), Candidate::Signed)
    }
}

impl IntoValue for usize {
    fn into_candidate(self) -> Candidate {
        u64::try_from(self)
            .map_or_else(|_| Candidate::Invalid(self.to_string()), Candidate::Unsigned)
    }
}

impl IntoValue for f32 {
    fn into_candidate(self) -> Candidate {
        Candidate::Float(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_candidate(self) -> Candidate {
        Candidate::Float(self)
    }
}

impl IntoValue for String {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::String(self))
    }
}

impl IntoValue for &String {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::String(self.clone()))
    }
}

impl IntoValue for &str {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::String(self.to_owned()))
    }
}

impl IntoValue for Vec<u8> {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Binary(self))
    }
}

impl IntoValue for &[u8] {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Binary(self.to_vec()))
    }
}

impl IntoValue for Url {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Uri(self))
    }
}

impl IntoValue for &Url {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Uri(self.clone()))
    }
}

impl IntoValue for UriRef {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::UriRef(self))
    }
}

impl IntoValue for &UriRef {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::UriRef(self.clone()))
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Timestamp(self))
    }
}

impl IntoValue for &DateTime<Utc> {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Timestamp(*self))
    }
}

impl IntoValue for DateTime<FixedOffset> {
    fn into_candidate(self) -> Candidate {
        Candidate::Value(Value::Timestamp(self.with_timezone(&Utc)))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_candidate(self) -> Candidate {
        match self {
            Some(v) => v.into_candidate(),
            None => Candidate::Invalid("nil".to_owned()),
        }
    }
}

/// Dynamic input: JSON scalars map onto the type system, everything else is
/// rejected.
impl IntoValue for serde_json::Value {
    fn into_candidate(self) -> Candidate {
        match self {
            serde_json::Value::Bool(b) => Candidate::Value(Value::Boolean(b)),
            serde_json::Value::String(s) => Candidate::Value(Value::String(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Candidate::Signed(i)
                } else if let Some(u) = n.as_u64() {
                    Candidate::Unsigned(u)
                } else if let Some(f) = n.as_f64() {
                    Candidate::Float(f)
                } else {
                    Candidate::Invalid(n.to_string())
                }
            },
            serde_json::Value::Null => Candidate::Invalid("null".to_owned()),
            serde_json::Value::Array(_) => Candidate::Invalid("array".to_owned()),
            serde_json::Value::Object(_) => Candidate::Invalid("object".to_owned()),
        }
    }
}

/// Validate an input and return its CloudEvents value.
///
/// Integers must fit in 32 bits; floats must additionally be integral.
///
/// # Errors
///
/// Returns [`ValueError::InvalidValue`] for inputs with no representation and
/// [`ValueError::OutOfRange`] for numbers outside the Integer range.
pub fn validate(input: impl IntoValue) -> ValueResult<Value> {
    match input.into_candidate() {
        Candidate::Value(v) => Ok(v),
        Candidate::Signed(i) => integer_from_i64(i).map(Value::Integer),
        Candidate::Unsigned(u) => integer_from_u64(u).map(Value::Integer),
        Candidate::Float(f) => {
            if f.is_finite() && f.fract() != 0.0 {
                return Err(ValueError::InvalidValue(format!("non-integral number {f}")));
            }
            integer_from_f64(f).map(Value::Integer)
        },
        Candidate::Invalid(what) => Err(ValueError::InvalidValue(what)),
    }
}

/// Canonical string form of a validated input.
///
/// # Errors
///
/// Returns the [`validate`] error when the input is not a CloudEvents value.
pub fn format(input: impl IntoValue) -> ValueResult<String> {
    validate(input).map(|v| v.to_string())
}

/// Narrow a signed integer to the Integer range.
///
/// # Errors
///
/// Returns [`ValueError::OutOfRange`] outside `[-2^31, 2^31)`.
pub fn integer_from_i64(i: i64) -> ValueResult<i32> {
    i32::try_from(i).map_err(|_| ValueError::OutOfRange(i.to_string()))
}

/// Narrow an unsigned integer to the Integer range.
///
/// # Errors
///
/// Returns [`ValueError::OutOfRange`] at or above `2^31`.
pub fn integer_from_u64(u: u64) -> ValueResult<i32> {
    i32::try_from(u).map_err(|_| ValueError::OutOfRange(u.to_string()))
}

/// Truncate a float toward zero and narrow it to the Integer range.
///
/// The accepted open interval is `(MinInt32 - 1, MaxInt32 + 1)`.
///
/// # Errors
///
/// Returns [`ValueError::OutOfRange`] for NaN and values outside the range.
pub fn integer_from_f64(f: f64) -> ValueResult<i32> {
    let t = f.trunc();
    if t.is_nan() || t < f64::from(i32::MIN) || t > f64::from(i32::MAX) {
        return Err(ValueError::OutOfRange(f.to_string()));
    }
    #[allow(clippy::cast_possible_truncation)]
    // Range was checked above; `t` is integral.
    Ok(t as i32)
}

/// Coerce to a boolean. Strings must be `true` or `false`.
///
/// # Errors
///
/// Returns [`ValueError::InvalidSyntax`] for other strings and
/// [`ValueError::CannotConvert`] for other types.
pub fn to_bool(input: impl IntoValue) -> ValueResult<bool> {
    match validate(input)? {
        Value::Boolean(b) => Ok(b),
        Value::String(s) => match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ValueError::InvalidSyntax {
                kind: ValueKind::Boolean,
                input: s,
            }),
        },
        other => Err(cannot_convert(&other, ValueKind::Boolean)),
    }
}

/// Coerce to a 32-bit integer.
///
/// Native numbers follow [`integer_from_i64`], [`integer_from_u64`] and
/// [`integer_from_f64`]. Strings are parsed as floats, truncated toward zero,
/// then range checked.
///
/// # Errors
///
/// Returns [`ValueError::InvalidSyntax`] for unparsable strings,
/// [`ValueError::OutOfRange`] for numbers outside the range and
/// [`ValueError::CannotConvert`] for other types.
pub fn to_integer(input: impl IntoValue) -> ValueResult<i32> {
    match input.into_candidate() {
        Candidate::Signed(i) => integer_from_i64(i),
        Candidate::Unsigned(u) => integer_from_u64(u),
        Candidate::Float(f) => integer_from_f64(f),
        Candidate::Invalid(what) => Err(ValueError::InvalidValue(what)),
        Candidate::Value(Value::Integer(i)) => Ok(i),
        Candidate::Value(Value::String(s)) => {
            let f: f64 = s.trim().parse().map_err(|_| ValueError::InvalidSyntax {
                kind: ValueKind::Integer,
                input: s.clone(),
            })?;
            integer_from_f64(f)
        },
        Candidate::Value(other) => Err(cannot_convert(&other, ValueKind::Integer)),
    }
}

/// Canonical string form of any valid input.
///
/// # Errors
///
/// Returns the [`validate`] error when the input is not a CloudEvents value.
pub fn to_string(input: impl IntoValue) -> ValueResult<String> {
    format(input)
}

/// Coerce to bytes. Strings are decoded as standard base64.
///
/// # Errors
///
/// Returns [`ValueError::IllegalBase64`] for malformed strings and
/// [`ValueError::CannotConvert`] for other types.
pub fn to_binary(input: impl IntoValue) -> ValueResult<Vec<u8>> {
    match validate(input)? {
        Value::Binary(b) => Ok(b),
        Value::String(s) => STANDARD
            .decode(s.as_bytes())
            .map_err(|e| ValueError::IllegalBase64(e.to_string())),
        other => Err(cannot_convert(&other, ValueKind::Binary)),
    }
}

/// Coerce to an absolute URI.
///
/// # Errors
///
/// Returns [`ValueError::NotAbsolute`] for relative references,
/// [`ValueError::InvalidUri`] for unparsable strings and
/// [`ValueError::CannotConvert`] for other types.
pub fn to_url(input: impl IntoValue) -> ValueResult<Url> {
    match validate(input)? {
        Value::Uri(u) => Ok(u),
        Value::UriRef(r) => r.to_url(),
        Value::String(s) => UriRef::parse(&s)?.to_url(),
        other => Err(cannot_convert(&other, ValueKind::Uri)),
    }
}

/// Coerce to a URI-reference.
///
/// # Errors
///
/// Returns [`ValueError::InvalidUri`] for unparsable strings and
/// [`ValueError::CannotConvert`] for other types.
pub fn to_uri_ref(input: impl IntoValue) -> ValueResult<UriRef> {
    match validate(input)? {
        Value::UriRef(r) => Ok(r),
        Value::Uri(u) => Ok(UriRef::from(u)),
        Value::String(s) => UriRef::parse(&s),
        other => Err(cannot_convert(&other, ValueKind::UriRef)),
    }
}

/// Coerce to a timestamp. Strings must be RFC 3339.
///
/// # Errors
///
/// Returns [`ValueError::NotRfc3339`] for malformed (including empty)
/// strings and [`ValueError::CannotConvert`] for other types.
pub fn to_time(input: impl IntoValue) -> ValueResult<DateTime<Utc>> {
    match validate(input)? {
        Value::Timestamp(t) => Ok(t),
        Value::String(s) => parse_timestamp(&s)?.ok_or(ValueError::NotRfc3339(s)),
        other => Err(cannot_convert(&other, ValueKind::Timestamp)),
    }
}

/// Parse an RFC 3339 timestamp with optional fractional seconds.
///
/// An empty string yields `Ok(None)`: no value, as opposed to a bad one.
///
/// # Errors
///
/// Returns [`ValueError::NotRfc3339`] when the text is not RFC 3339.
pub fn parse_timestamp(input: &str) -> ValueResult<Option<DateTime<Utc>>> {
    if input.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(input)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| ValueError::NotRfc3339(input.to_owned()))
}

fn cannot_convert(from: &Value, to: ValueKind) -> ValueError {
    ValueError::CannotConvert {
        from: from.kind(),
        to,
    }
}
