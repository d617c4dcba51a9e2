//! Versioned event contexts.
//!
//! [`EventContext`] is a tagged union over the per-version records
//! [`ContextV03`] and [`ContextV10`]. The shared attributes are read and
//! written through the union; version-specific ones (`schemaurl` versus
//! `dataschema`, `datacontentencoding`) dispatch on the tag.
//!
//! Converting between versions moves exactly two things: a 0.3
//! `datacontentencoding` travels as a 1.0 extension of the same name, and a
//! 0.3 `schemaurl` that is not an absolute URL in canonical form travels as
//! a `schemaurl` extension holding a [`Value::UriRef`]. Both come back out
//! when converting to 0.3, so `ctx.as_v1().as_v03() == ctx`. Only a
//! `UriRef` extension that 0.3 could have produced is pulled back; any other
//! `schemaurl` extension on a 1.0 context is left as it is.

mod v03;
mod v10;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::trace;
use url::Url;

use crate::content_type;
use crate::error::{
    EventError, EventResult, FieldError, ValidationError, ValueError, ValueResult,
};
use crate::spec_version::{AttributeKind, SpecVersion};
use crate::value::{IntoValue, UriRef, Value, to_string, to_time, to_uri_ref, to_url, validate};

pub use v03::ContextV03;
pub use v10::ContextV10;

/// Extension carrying a 0.3 `datacontentencoding` on a 1.0 context.
pub const DATA_CONTENT_ENCODING_EXT: &str = "datacontentencoding";

/// Extension carrying a 0.3 `schemaurl` that has no exact 1.0 `dataschema`.
pub const SCHEMA_URL_EXT: &str = "schemaurl";

/// The `dataschema` a 0.3 `schemaurl` becomes, when parsing keeps its text.
fn exact_url(schema_url: &UriRef) -> Option<Url> {
    schema_url
        .to_url()
        .ok()
        .filter(|url| url.as_str() == schema_url.as_str())
}

macro_rules! each {
    ($ctx:expr, $c:ident => $body:expr) => {
        match $ctx {
            EventContext::V03($c) => $body,
            EventContext::V10($c) => $body,
        }
    };
}

/// The attribute portion of an event, tagged by spec version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventContext {
    /// CloudEvents 0.3 attributes.
    V03(ContextV03),
    /// CloudEvents 1.0 attributes.
    V10(ContextV10),
}

impl Default for EventContext {
    fn default() -> Self {
        Self::V10(ContextV10::default())
    }
}

impl From<ContextV03> for EventContext {
    fn from(ctx: ContextV03) -> Self {
        Self::V03(ctx)
    }
}

impl From<ContextV10> for EventContext {
    fn from(ctx: ContextV10) -> Self {
        Self::V10(ctx)
    }
}

impl EventContext {
    /// An empty context of the given version.
    #[must_use]
    pub fn new(version: SpecVersion) -> Self {
        match version {
            SpecVersion::V03 => Self::V03(ContextV03::default()),
            SpecVersion::V10 => Self::V10(ContextV10::default()),
        }
    }

    /// The spec version tag.
    #[must_use]
    pub fn spec_version(&self) -> SpecVersion {
        match self {
            Self::V03(_) => SpecVersion::V03,
            Self::V10(_) => SpecVersion::V10,
        }
    }

    /// `id`.
    #[must_use]
    pub fn id(&self) -> &str {
        each!(self, c => &c.id)
    }

    /// `type`.
    #[must_use]
    pub fn ty(&self) -> &str {
        each!(self, c => &c.ty)
    }

    /// `source`.
    #[must_use]
    pub fn source(&self) -> &UriRef {
        each!(self, c => &c.source)
    }

    /// `subject`.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        each!(self, c => c.subject.as_deref())
    }

    /// `time`.
    #[must_use]
    pub fn time(&self) -> Option<&DateTime<Utc>> {
        each!(self, c => c.time.as_ref())
    }

    /// `dataschema` (1.0) or `schemaurl` (0.3) in string form.
    #[must_use]
    pub fn data_schema(&self) -> Option<&str> {
        match self {
            Self::V03(c) => c.schema_url.as_ref().map(UriRef::as_str),
            Self::V10(c) => c.data_schema.as_ref().map(url::Url::as_str),
        }
    }

    /// `datacontenttype` as set.
    #[must_use]
    pub fn data_content_type(&self) -> Option<&str> {
        each!(self, c => c.data_content_type.as_deref())
    }

    /// `datacontenttype` without parameters.
    #[must_use]
    pub fn data_media_type(&self) -> Option<&str> {
        self.data_content_type().map(content_type::media_type)
    }

    /// `datacontentencoding`; always `None` on 1.0 contexts.
    #[must_use]
    pub fn data_content_encoding(&self) -> Option<&str> {
        match self {
            Self::V03(c) => c.data_content_encoding.as_deref(),
            Self::V10(_) => None,
        }
    }

    /// Whether the payload is transported base64-encoded: a 0.3
    /// `datacontentencoding` of `base64`.
    #[must_use]
    pub fn is_base64_encoded(&self) -> bool {
        self.data_content_encoding()
            .is_some_and(|enc| enc.trim().eq_ignore_ascii_case("base64"))
    }

    /// Extension attributes, keyed by lowercase name.
    #[must_use]
    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        each!(self, c => &c.extensions)
    }

    /// Mutable access to the extension map. Names written here are not
    /// checked until [`EventContext::validate`].
    pub fn extensions_mut(&mut self) -> &mut BTreeMap<String, Value> {
        each!(self, c => &mut c.extensions)
    }

    /// A single extension value.
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        let extensions = self.extensions();
        extensions
            .get(name)
            .or_else(|| extensions.get(&name.to_ascii_lowercase()))
    }

    /// Set `id`.
    pub fn set_id(&mut self, id: impl Into<String>) {
        each!(self, c => c.id = id.into());
    }

    /// Set `type`.
    pub fn set_type(&mut self, ty: impl Into<String>) {
        each!(self, c => c.ty = ty.into());
    }

    /// Set `source`.
    ///
    /// # Errors
    ///
    /// Returns a conversion error when the input is not a URI-reference.
    pub fn set_source(&mut self, source: impl IntoValue) -> ValueResult<()> {
        let source = to_uri_ref(source)?;
        each!(self, c => c.source = source);
        Ok(())
    }

    /// Set or clear `subject`.
    pub fn set_subject(&mut self, subject: Option<String>) {
        each!(self, c => c.subject = subject);
    }

    /// Set or clear `time`.
    pub fn set_time(&mut self, time: Option<DateTime<Utc>>) {
        each!(self, c => c.time = time);
    }

    /// Set or clear `dataschema` / `schemaurl`.
    ///
    /// # Errors
    ///
    /// Returns a conversion error when the input is not an absolute URI on
    /// 1.0, or not a URI-reference on 0.3.
    pub fn set_data_schema(&mut self, schema: Option<impl IntoValue>) -> ValueResult<()> {
        match self {
            Self::V03(c) => c.schema_url = schema.map(to_uri_ref).transpose()?,
            Self::V10(c) => c.data_schema = schema.map(to_url).transpose()?,
        }
        Ok(())
    }

    /// Set or clear `datacontenttype`.
    pub fn set_data_content_type(&mut self, content_type: Option<String>) {
        each!(self, c => c.data_content_type = content_type);
    }

    /// Set or clear `datacontentencoding`.
    ///
    /// On a 1.0 context the value is kept as the `datacontentencoding`
    /// extension, as a converted 0.3 context would carry it.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidValue`] for anything but `base64`.
    pub fn set_data_content_encoding(&mut self, encoding: Option<String>) -> ValueResult<()> {
        if let Some(enc) = &encoding
            && !enc.trim().eq_ignore_ascii_case("base64")
        {
            return Err(ValueError::InvalidValue(format!(
                "datacontentencoding must be \"base64\", got {enc:?}"
            )));
        }
        match self {
            Self::V03(c) => c.data_content_encoding = encoding,
            Self::V10(c) => match encoding {
                Some(enc) => {
                    c.extensions
                        .insert(DATA_CONTENT_ENCODING_EXT.to_owned(), Value::String(enc));
                },
                None => {
                    c.extensions.remove(DATA_CONTENT_ENCODING_EXT);
                },
            },
        }
        Ok(())
    }

    /// Set an extension attribute.
    ///
    /// The name is lowercased and must match `[a-z0-9]+` without shadowing an
    /// attribute of the context's version. The value is validated through the
    /// type system.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidExtensionName`],
    /// [`EventError::ReservedExtensionName`] or the value's validation error.
    pub fn set_extension(&mut self, name: &str, value: impl IntoValue) -> EventResult<()> {
        let key = extension_key(name, self.spec_version())?;
        let value = validate(value)?;
        trace!(extension = %key, kind = %value.kind(), "set extension");
        each!(self, c => c.extensions.insert(key, value));
        Ok(())
    }

    /// Remove an extension attribute, returning its value.
    pub fn remove_extension(&mut self, name: &str) -> Option<Value> {
        let key = name.to_ascii_lowercase();
        each!(self, c => c.extensions.remove(&key))
    }

    /// Read any context attribute as a [`Value`].
    ///
    /// Required attributes are reported even when empty; optional ones are
    /// `None` when unset or undefined by the version.
    #[must_use]
    pub fn get(&self, kind: AttributeKind) -> Option<Value> {
        match kind {
            AttributeKind::SpecVersion => Some(Value::from(self.spec_version().as_str())),
            AttributeKind::Id => Some(Value::from(self.id())),
            AttributeKind::Type => Some(Value::from(self.ty())),
            AttributeKind::Source => Some(Value::UriRef(self.source().clone())),
            AttributeKind::Subject => self.subject().map(Value::from),
            AttributeKind::Time => self.time().copied().map(Value::Timestamp),
            AttributeKind::DataSchema => match self {
                Self::V03(c) => c.schema_url.clone().map(Value::UriRef),
                Self::V10(c) => c.data_schema.clone().map(Value::Uri),
            },
            AttributeKind::DataContentType => self.data_content_type().map(Value::from),
            AttributeKind::DataContentEncoding => self.data_content_encoding().map(Value::from),
        }
    }

    /// Write any context attribute from a [`Value`], coercing it to the
    /// attribute's type. `None` clears optional attributes and blanks
    /// required ones.
    ///
    /// Setting [`AttributeKind::SpecVersion`] converts the context.
    ///
    /// # Errors
    ///
    /// Returns the coercion error or [`EventError::UnknownSpecVersion`].
    pub fn set(&mut self, kind: AttributeKind, value: Option<Value>) -> EventResult<()> {
        match kind {
            AttributeKind::SpecVersion => {
                let text = value.map(to_string).transpose()?.unwrap_or_default();
                let version: SpecVersion = text.parse()?;
                self.convert_to(version);
            },
            AttributeKind::Id => self.set_id(value.map(to_string).transpose()?.unwrap_or_default()),
            AttributeKind::Type => {
                self.set_type(value.map(to_string).transpose()?.unwrap_or_default());
            },
            AttributeKind::Source => match value {
                Some(v) => self.set_source(v)?,
                None => each!(self, c => c.source = UriRef::default()),
            },
            AttributeKind::Subject => self.set_subject(value.map(to_string).transpose()?),
            AttributeKind::Time => self.set_time(value.map(to_time).transpose()?),
            AttributeKind::DataSchema => self.set_data_schema(value)?,
            AttributeKind::DataContentType => {
                self.set_data_content_type(value.map(to_string).transpose()?);
            },
            AttributeKind::DataContentEncoding => {
                self.set_data_content_encoding(value.map(to_string).transpose()?)?;
            },
        }
        Ok(())
    }

    /// This context as 1.0.
    #[must_use]
    pub fn as_v1(&self) -> ContextV10 {
        match self {
            Self::V03(c) => c.as_v1(),
            Self::V10(c) => c.clone(),
        }
    }

    /// This context as 0.3.
    #[must_use]
    pub fn as_v03(&self) -> ContextV03 {
        match self {
            Self::V03(c) => c.clone(),
            Self::V10(c) => c.as_v03(),
        }
    }

    /// This context converted to `version`.
    #[must_use]
    pub fn as_version(&self, version: SpecVersion) -> EventContext {
        match version {
            SpecVersion::V03 => Self::V03(self.as_v03()),
            SpecVersion::V10 => Self::V10(self.as_v1()),
        }
    }

    /// Convert in place. A no-op when already at `version`.
    pub fn convert_to(&mut self, version: SpecVersion) {
        if self.spec_version() != version {
            trace!(from = %self.spec_version(), to = %version, "converting context");
            *self = self.as_version(version);
        }
    }

    /// Check every attribute of the context.
    ///
    /// # Errors
    ///
    /// Returns one entry per failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        each!(self, c => c.validate())
    }
}

/// Whether `name` is a legal extension name once lowercased.
#[must_use]
pub fn is_valid_extension_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Lowercase and check an extension name against `version`.
///
/// # Errors
///
/// Returns [`EventError::InvalidExtensionName`] or
/// [`EventError::ReservedExtensionName`].
pub fn extension_key(name: &str, version: SpecVersion) -> EventResult<String> {
    let key = name.to_ascii_lowercase();
    if !is_valid_extension_name(&key) {
        return Err(EventError::InvalidExtensionName(name.to_owned()));
    }
    if version.is_reserved(&key) {
        return Err(EventError::ReservedExtensionName { name: key, version });
    }
    Ok(key)
}

fn validate_common(
    version: SpecVersion,
    id: &str,
    ty: &str,
    source: &UriRef,
    subject: Option<&str>,
    data_content_type: Option<&str>,
    extensions: &BTreeMap<String, Value>,
) -> ValidationError {
    let mut errors = ValidationError::new();
    if id.trim().is_empty() {
        errors.insert("id", FieldError::Missing);
    }
    if ty.trim().is_empty() {
        errors.insert("type", FieldError::Missing);
    }
    if source.as_str().trim().is_empty() {
        errors.insert("source", FieldError::Missing);
    }
    if subject.is_some_and(|s| s.trim().is_empty()) {
        errors.insert(
            "subject",
            FieldError::Invalid("if present, MUST be a non-empty string".to_owned()),
        );
    }
    if let Some(ct) = data_content_type
        && !content_type::is_valid(ct)
    {
        errors.insert(
            "datacontenttype",
            FieldError::Invalid(format!("if present, MUST adhere to RFC 2046, got {ct:?}")),
        );
    }
    for name in extensions.keys() {
        if let Err(e) = extension_key(name, version) {
            errors.insert(name.clone(), FieldError::Invalid(e.to_string()));
        } else if name.to_ascii_lowercase() != *name {
            errors.insert(
                name.clone(),
                FieldError::Invalid("extension names must be lowercase".to_owned()),
            );
        }
    }
    errors
}
