//! The pull-model message abstraction.
//!
//! A [`Message`] hands its content to a writer: a [`StructuredWriter`]
//! receives the media type and the serialized event, a [`BinaryWriter`]
//! receives one callback per attribute followed by the payload. Binary
//! readers deliver `specversion` before any other attribute.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{Attribute, AttributeKind, Event, EventContext, SpecVersion, Value};
use herald_format::Format;

use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};

/// Cheap attribute lookup without materializing an event.
pub trait MetadataReader: Send + Sync {
    /// Spec version of the message.
    fn spec_version(&self) -> SpecVersion;

    /// An attribute value, `None` when absent.
    fn attribute(&self, kind: AttributeKind) -> Option<Value>;

    /// An extension value, `None` when absent.
    fn extension(&self, name: &str) -> Option<Value>;
}

/// Receives attributes and extensions.
pub trait MetadataWriter: Send {
    /// Set or, with `None`, remove an attribute.
    ///
    /// # Errors
    ///
    /// Returns the writer's error for values it cannot accept.
    fn set_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> BindingResult<()>;

    /// Set or, with `None`, remove an extension.
    ///
    /// # Errors
    ///
    /// Returns the writer's error for names or values it cannot accept.
    fn set_extension(&mut self, name: &str, value: Option<Value>) -> BindingResult<()>;
}

/// Receives a binary-mode message.
///
/// The router calls [`start`](Self::start), then the message delivers
/// attributes and data, then transformers run, then the router calls
/// [`end`](Self::end).
pub trait BinaryWriter: MetadataWriter {
    /// Called before any attribute.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    fn start(&mut self) -> BindingResult<()> {
        Ok(())
    }

    /// The payload.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    fn set_data(&mut self, data: &[u8]) -> BindingResult<()>;

    /// Called after the last attribute and the payload.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    fn end(&mut self) -> BindingResult<()> {
        Ok(())
    }
}

/// Receives a structured-mode message.
pub trait StructuredWriter: Send {
    /// The serialized event and its media type.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    fn set_structured_event(&mut self, media_type: &str, body: &[u8]) -> BindingResult<()>;
}

/// A readable event source with a single-shot completion.
///
/// Reads take `&self`: transports that consume a stream keep it behind
/// interior mutability. Except for buffered copies, a message is read once.
#[async_trait]
pub trait Message: Send + Sync {
    /// How this message carries its event.
    fn encoding(&self) -> Encoding;

    /// Deliver the serialized event.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::NotStructured`] unless the encoding is
    /// structured (or event, for messages that can serialize themselves).
    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()>;

    /// Deliver attributes, `specversion` first, then the payload.
    ///
    /// Does not call [`BinaryWriter::start`] or [`BinaryWriter::end`].
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::NotBinary`] unless the encoding is binary
    /// (or event).
    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()>;

    /// Attribute lookup without a full read, when the message supports it.
    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        None
    }

    /// The in-memory event, for event-native messages.
    fn as_event(&self) -> Option<&Event> {
        None
    }

    /// Complete the message. Called exactly once, after all reads.
    ///
    /// # Errors
    ///
    /// Returns the transport's error.
    fn finish(&self, error: Option<BindingError>) -> BindingResult<()>;
}

#[async_trait]
impl<M: Message + ?Sized> Message for Arc<M> {
    fn encoding(&self) -> Encoding {
        (**self).encoding()
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        (**self).read_structured(writer).await
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        (**self).read_binary(writer).await
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        (**self).metadata_reader()
    }

    fn as_event(&self) -> Option<&Event> {
        (**self).as_event()
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        (**self).finish(error)
    }
}

impl MetadataReader for EventContext {
    fn spec_version(&self) -> SpecVersion {
        EventContext::spec_version(self)
    }

    fn attribute(&self, kind: AttributeKind) -> Option<Value> {
        self.get(kind)
    }

    fn extension(&self, name: &str) -> Option<Value> {
        EventContext::extension(self, name).cloned()
    }
}

impl MetadataReader for Event {
    fn spec_version(&self) -> SpecVersion {
        self.context().spec_version()
    }

    fn attribute(&self, kind: AttributeKind) -> Option<Value> {
        self.context().get(kind)
    }

    fn extension(&self, name: &str) -> Option<Value> {
        self.context().extension(name).cloned()
    }
}

/// Building an event from attribute callbacks. A `specversion` attribute
/// converts the event to that version.
impl MetadataWriter for Event {
    fn set_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> BindingResult<()> {
        self.context_mut().set(attribute.kind(), value)?;
        Ok(())
    }

    fn set_extension(&mut self, name: &str, value: Option<Value>) -> BindingResult<()> {
        match value {
            Some(value) => self.context_mut().set_extension(name, value)?,
            None => {
                self.context_mut().remove_extension(name);
            },
        }
        Ok(())
    }
}

impl BinaryWriter for Event {
    fn set_data(&mut self, data: &[u8]) -> BindingResult<()> {
        self.set_data_raw(Some(data.to_vec()), false);
        Ok(())
    }
}

/// Replay an event as binary callbacks, `specversion` first.
pub(crate) fn write_event_binary(event: &Event, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
    let ctx = event.context();
    let version = ctx.spec_version();
    for kind in version.attributes() {
        if let Some(value) = ctx.get(*kind) {
            writer.set_attribute(Attribute::new(*kind, version), Some(value))?;
        }
    }
    for (name, value) in ctx.extensions() {
        writer.set_extension(name, Some(value.clone()))?;
    }
    if let Some(data) = event.data() {
        writer.set_data(data)?;
    }
    Ok(())
}

/// Serialize an event with `format` into a structured writer.
pub(crate) fn write_event_structured(
    event: &Event,
    format: &dyn Format,
    writer: &mut dyn StructuredWriter,
) -> BindingResult<()> {
    let body = format.marshal(event)?;
    writer.set_structured_event(format.media_type(), &body)
}
