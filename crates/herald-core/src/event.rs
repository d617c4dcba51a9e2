//! The [`Event`] root type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::content_type;
use crate::context::EventContext;
use crate::data::{self, Payload, PayloadSink, ProtoSink, Slot};
use crate::error::{CodecError, EventError, EventResult, FieldError, ValidationError};
use crate::spec_version::SpecVersion;
use crate::value::{IntoValue, UriRef, Value};

/// A CloudEvent: versioned context attributes plus an optional payload.
///
/// The payload is kept in its serialized form, keyed by
/// `datacontenttype`. `data_base64` only steers JSON serialization: when set,
/// a 1.0 event carries its payload under `data_base64`.
///
/// Setters never fail. A setter that receives an invalid value records the
/// failure against the field; [`Event::validate`] reports every recorded
/// failure together with the context's own checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    context: EventContext,
    data: Option<Vec<u8>>,
    data_base64: bool,
    field_errors: ValidationError,
}

impl Event {
    /// An empty event of the given version.
    #[must_use]
    pub fn new(version: SpecVersion) -> Self {
        Self {
            context: EventContext::new(version),
            ..Self::default()
        }
    }

    /// An event wrapping an existing context, without data.
    #[must_use]
    pub fn from_context(context: impl Into<EventContext>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    /// The context attributes.
    #[must_use]
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Mutable access to the context. Direct writes bypass the field-error
    /// bookkeeping of the setters.
    pub fn context_mut(&mut self) -> &mut EventContext {
        &mut self.context
    }

    /// Split into context and payload.
    #[must_use]
    pub fn into_parts(self) -> (EventContext, Option<Vec<u8>>) {
        (self.context, self.data)
    }

    /// The spec version.
    #[must_use]
    pub fn spec_version(&self) -> SpecVersion {
        self.context.spec_version()
    }

    /// `id`.
    #[must_use]
    pub fn id(&self) -> &str {
        self.context.id()
    }

    /// `type`.
    #[must_use]
    pub fn ty(&self) -> &str {
        self.context.ty()
    }

    /// `source`.
    #[must_use]
    pub fn source(&self) -> &UriRef {
        self.context.source()
    }

    /// `subject`.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.context.subject()
    }

    /// `time`.
    #[must_use]
    pub fn time(&self) -> Option<&DateTime<Utc>> {
        self.context.time()
    }

    /// `dataschema` / `schemaurl`.
    #[must_use]
    pub fn data_schema(&self) -> Option<&str> {
        self.context.data_schema()
    }

    /// `datacontenttype`.
    #[must_use]
    pub fn data_content_type(&self) -> Option<&str> {
        self.context.data_content_type()
    }

    /// `datacontenttype` without parameters, empty when unset.
    #[must_use]
    pub fn data_media_type(&self) -> &str {
        self.context.data_media_type().unwrap_or_default()
    }

    /// A single extension value.
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.context.extension(name)
    }

    /// Failures recorded by setters since they were last cleared.
    #[must_use]
    pub fn field_errors(&self) -> &ValidationError {
        &self.field_errors
    }

    fn record<E: Into<FieldError>>(&mut self, field: &str, result: Result<(), E>) {
        match result {
            Ok(()) => {
                self.field_errors.remove(field);
            },
            Err(e) => {
                let e = e.into();
                warn!(field, error = %e, "rejected attribute value");
                self.field_errors.insert(field, e);
            },
        }
    }

    /// Convert the context to `version`.
    pub fn set_spec_version(&mut self, version: SpecVersion) {
        self.context.convert_to(version);
    }

    /// Set `id`.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        let result = if id.trim().is_empty() {
            Err(FieldError::Missing)
        } else {
            Ok(())
        };
        self.context.set_id(id);
        self.record("id", result);
    }

    /// Set `type`.
    pub fn set_type(&mut self, ty: impl Into<String>) {
        let ty = ty.into();
        let result = if ty.trim().is_empty() {
            Err(FieldError::Missing)
        } else {
            Ok(())
        };
        self.context.set_type(ty);
        self.record("type", result);
    }

    /// Set `source`, a URI-reference.
    pub fn set_source(&mut self, source: impl IntoValue) {
        let result = self.context.set_source(source);
        self.record("source", result);
    }

    /// Set `subject`.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.context.set_subject(Some(subject.into()));
    }

    /// Set `time`.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.context.set_time(Some(time));
    }

    /// Set `dataschema` (absolute URI on 1.0) or `schemaurl` (URI-reference
    /// on 0.3).
    pub fn set_data_schema(&mut self, schema: impl IntoValue) {
        let field = if self.spec_version() == SpecVersion::V03 {
            "schemaurl"
        } else {
            "dataschema"
        };
        let result = self.context.set_data_schema(Some(schema));
        self.record(field, result);
    }

    /// Set `datacontenttype`.
    pub fn set_data_content_type(&mut self, content_type: impl Into<String>) {
        let ct = content_type.into();
        let result = if ct.is_empty() || content_type::is_valid(&ct) {
            Ok(())
        } else {
            Err(FieldError::Invalid(format!("not a media type: {ct:?}")))
        };
        self.context
            .set_data_content_type(if ct.is_empty() { None } else { Some(ct) });
        self.record("datacontenttype", result);
    }

    /// Set `datacontentencoding`. Only `base64` is accepted.
    pub fn set_data_content_encoding(&mut self, encoding: impl Into<String>) {
        let result = self.context.set_data_content_encoding(Some(encoding.into()));
        self.record("datacontentencoding", result);
    }

    /// Set an extension attribute. See [`EventContext::set_extension`].
    pub fn set_extension(&mut self, name: &str, value: impl IntoValue) {
        let result = self.context.set_extension(name, value);
        self.record(&name.to_ascii_lowercase(), result);
    }

    /// Remove an extension attribute.
    pub fn remove_extension(&mut self, name: &str) -> Option<Value> {
        self.field_errors.remove(&name.to_ascii_lowercase());
        self.context.remove_extension(name)
    }

    /// The stored payload bytes.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Take the payload out, leaving the event without data.
    pub fn take_data(&mut self) -> Option<Vec<u8>> {
        self.data_base64 = false;
        self.data.take()
    }

    /// Whether JSON serialization emits the payload as base64.
    #[must_use]
    pub fn data_base64(&self) -> bool {
        self.data_base64
    }

    /// Override the base64 flag.
    pub fn set_data_base64(&mut self, base64: bool) {
        self.data_base64 = base64;
    }

    /// Store already-encoded payload bytes without touching the context.
    pub fn set_data_raw(&mut self, data: Option<Vec<u8>>, base64: bool) {
        self.data = data;
        self.data_base64 = base64;
    }

    /// Store payload bytes as-is and set `datacontenttype`.
    ///
    /// The payload is flagged base64 unless the content type is JSON.
    pub fn set_data_bytes(&mut self, content_type: impl Into<String>, data: impl Into<Vec<u8>>) {
        let ct = content_type.into();
        self.data_base64 = !content_type::is_json(&ct);
        self.data = Some(data.into());
        self.set_data_content_type(ct);
    }

    /// Encode a payload with the data codec registered for `content_type`
    /// and store it.
    ///
    /// # Errors
    ///
    /// Returns the codec error; the event is left unchanged.
    pub fn set_data_with(&mut self, content_type: &str, payload: Payload<'_>) -> EventResult<()> {
        let bytes = data::encode(content_type, payload)?;
        self.set_data_bytes(content_type, bytes);
        Ok(())
    }

    /// Encode a serde value and store it. An empty content type encodes
    /// JSON.
    ///
    /// # Errors
    ///
    /// Returns the codec error; the event is left unchanged.
    pub fn set_data<T: Serialize>(&mut self, content_type: &str, value: &T) -> EventResult<()> {
        self.set_data_with(content_type, Payload::Serde(value))
    }

    /// Encode a protobuf message (wrapped in `Any`) and store it under
    /// `application/protobuf`.
    ///
    /// # Errors
    ///
    /// Returns the codec error; the event is left unchanged.
    pub fn set_proto_data<M: prost::Name>(&mut self, message: &M) -> EventResult<()> {
        self.set_data_with(content_type::APPLICATION_PROTOBUF, Payload::Proto(message))
    }

    /// Decode the payload with the data codec for its content type.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NoData`] without a payload, otherwise the codec
    /// error.
    pub fn data_as<T: DeserializeOwned>(&self) -> EventResult<T> {
        let bytes = self.data.as_deref().ok_or(EventError::NoData)?;
        let mut slot = Slot::<T>::default();
        data::decode(self.data_media_type(), bytes, PayloadSink::Serde(&mut slot))?;
        slot.0.ok_or_else(|| {
            EventError::Codec(CodecError::decode(
                self.data_media_type(),
                "decoder produced no value".to_owned(),
            ))
        })
    }

    /// Decode a protobuf payload into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NoData`] without a payload, otherwise the codec
    /// error.
    pub fn proto_data_into(&self, out: &mut dyn ProtoSink) -> EventResult<()> {
        let bytes = self.data.as_deref().ok_or(EventError::NoData)?;
        data::decode(self.data_media_type(), bytes, PayloadSink::Proto(out))?;
        Ok(())
    }

    /// Decode a protobuf payload into a fresh message.
    ///
    /// # Errors
    ///
    /// See [`Event::proto_data_into`].
    pub fn proto_data_as<M: prost::Message + Default>(&self) -> EventResult<M> {
        let mut out = M::default();
        self.proto_data_into(&mut out)?;
        Ok(out)
    }

    /// Recorded setter failures merged with the context's checks.
    ///
    /// # Errors
    ///
    /// Returns one entry per failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = self.field_errors.clone();
        if let Err(context_errors) = self.context.validate() {
            errors.merge(context_errors);
        }
        errors.into_result()
    }
}

impl From<EventContext> for Event {
    fn from(context: EventContext) -> Self {
        Self::from_context(context)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.spec_version();
        writeln!(f, "Context Attributes,")?;
        for kind in version.attributes() {
            if let Some(value) = self.context.get(*kind) {
                writeln!(f, "  {}: {value}", kind.name(version).unwrap_or_default())?;
            }
        }
        let extensions = self.context.extensions();
        if !extensions.is_empty() {
            writeln!(f, "Extensions,")?;
            for (name, value) in extensions {
                writeln!(f, "  {name}: {value}")?;
            }
        }
        if let Some(bytes) = &self.data {
            if self.data_base64 {
                writeln!(f, "Data (binary),")?;
            } else {
                writeln!(f, "Data,")?;
            }
            let pretty = content_type::is_json(self.data_media_type())
                .then(|| serde_json::from_slice::<serde_json::Value>(bytes).ok())
                .flatten()
                .and_then(|v| serde_json::to_string_pretty(&v).ok());
            match pretty {
                Some(text) => {
                    for line in text.lines() {
                        writeln!(f, "  {line}")?;
                    }
                },
                None => writeln!(f, "  {}", String::from_utf8_lossy(bytes))?,
            }
        }
        Ok(())
    }
}
