//! In-memory copies of messages.
//!
//! A transport message can usually be read once. [`copy_message`] drains it
//! into a [`BufferedMessage`] that can be read any number of times, keeping
//! the original encoding when the transformers allow it.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::Event;
use herald_format::{JsonFormat, registry};
use tracing::debug;

use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{
    BinaryWriter, Message, MetadataReader, StructuredWriter, write_event_binary,
    write_event_structured,
};
use crate::to_event::to_event;
use crate::transformer::Transformers;
use crate::write::{WriteContext, direct_write_unguarded};

/// A [`StructuredWriter`] that keeps the body in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredBuffer {
    media_type: Option<String>,
    body: Vec<u8>,
}

impl StructuredBuffer {
    /// Media type written, if any.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Media type and body.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::NotStructured`] when nothing was written.
    pub fn into_parts(self) -> BindingResult<(String, Vec<u8>)> {
        let media_type = self.media_type.ok_or(BindingError::NotStructured)?;
        Ok((media_type, self.body))
    }

    /// Decode the body with the format registered for its media type.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::NotStructured`] when nothing was written, or
    /// the format's error.
    pub fn into_event(self) -> BindingResult<Event> {
        let (media_type, body) = self.into_parts()?;
        let format = registry::require(&media_type)?;
        Ok(format.unmarshal(&body)?)
    }
}

impl StructuredWriter for StructuredBuffer {
    fn set_structured_event(&mut self, media_type: &str, body: &[u8]) -> BindingResult<()> {
        self.media_type = Some(media_type.to_owned());
        self.body.clear();
        self.body.extend_from_slice(body);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Buffered {
    Structured { media_type: String, body: Vec<u8> },
    Binary(Event),
    Event(Event),
}

/// A message held in memory.
///
/// Reads replay the buffered content and may be repeated. `finish` goes to
/// the original message when the copy was made with [`buffer_message`].
#[derive(Clone)]
pub struct BufferedMessage {
    content: Buffered,
    original: Option<Arc<dyn Message>>,
}

impl BufferedMessage {
    /// Body and media type of a structured copy.
    #[must_use]
    pub fn structured(&self) -> Option<(&str, &[u8])> {
        match &self.content {
            Buffered::Structured { media_type, body } => Some((media_type.as_str(), body.as_slice())),
            Buffered::Binary(_) | Buffered::Event(_) => None,
        }
    }
}

impl std::fmt::Debug for BufferedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedMessage")
            .field("content", &self.content)
            .field("has_original", &self.original.is_some())
            .finish()
    }
}

/// Read `message` into memory, applying `transformers`.
///
/// Structured and binary messages keep their encoding when every
/// transformer supports it; otherwise the copy holds the event. The copy's
/// `finish` does nothing and `message` is not finished.
///
/// # Errors
///
/// Returns the read, transform or decode error.
pub async fn copy_message(
    message: &dyn Message,
    transformers: &Transformers,
) -> BindingResult<BufferedMessage> {
    let mut structured = StructuredBuffer::default();
    let mut binary = Event::default();
    let written = direct_write_unguarded(
        &WriteContext::default(),
        message,
        Some(&mut structured),
        Some(&mut binary),
        transformers,
    )
    .await?;

    let content = match written {
        Encoding::Structured => {
            let (media_type, body) = structured.into_parts()?;
            Buffered::Structured { media_type, body }
        },
        Encoding::Binary => Buffered::Binary(binary),
        Encoding::Event | Encoding::Unknown => Buffered::Event(to_event(message, transformers).await?),
    };
    debug!(encoding = %written, "message copied");
    Ok(BufferedMessage {
        content,
        original: None,
    })
}

/// Like [`copy_message`], but `finish` on the copy finishes `message`.
///
/// # Errors
///
/// See [`copy_message`].
pub async fn buffer_message(
    message: Arc<dyn Message>,
    transformers: &Transformers,
) -> BindingResult<BufferedMessage> {
    let mut copy = copy_message(message.as_ref(), transformers).await?;
    copy.original = Some(message);
    Ok(copy)
}

#[async_trait]
impl Message for BufferedMessage {
    fn encoding(&self) -> Encoding {
        match self.content {
            Buffered::Structured { .. } => Encoding::Structured,
            Buffered::Binary(_) => Encoding::Binary,
            Buffered::Event(_) => Encoding::Event,
        }
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        match &self.content {
            Buffered::Structured { media_type, body } => writer.set_structured_event(media_type, body),
            Buffered::Event(event) => write_event_structured(event, &JsonFormat, writer),
            Buffered::Binary(_) => Err(BindingError::NotStructured),
        }
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        match &self.content {
            Buffered::Binary(event) | Buffered::Event(event) => write_event_binary(event, writer),
            Buffered::Structured { .. } => Err(BindingError::NotBinary),
        }
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        match &self.content {
            Buffered::Binary(event) | Buffered::Event(event) => Some(event),
            Buffered::Structured { .. } => None,
        }
    }

    fn as_event(&self) -> Option<&Event> {
        match &self.content {
            Buffered::Event(event) => Some(event),
            Buffered::Structured { .. } | Buffered::Binary(_) => None,
        }
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        match &self.original {
            Some(original) => original.finish(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SpecVersion;
    use herald_core::content_type::APPLICATION_CLOUDEVENTS_JSON;

    #[test]
    fn test_structured_buffer() {
        let mut buffer = StructuredBuffer::default();
        assert!(matches!(
            buffer.clone().into_parts(),
            Err(BindingError::NotStructured)
        ));
        buffer
            .set_structured_event(
                APPLICATION_CLOUDEVENTS_JSON,
                br#"{"specversion":"1.0","id":"1","type":"t","source":"/s"}"#,
            )
            .unwrap();
        assert_eq!(buffer.media_type(), Some(APPLICATION_CLOUDEVENTS_JSON));
        let event = buffer.into_event().unwrap();
        assert_eq!(event.id(), "1");
    }

    #[test]
    fn test_unknown_media_type() {
        let mut buffer = StructuredBuffer::default();
        buffer.set_structured_event("application/x-nope", b"{}").unwrap();
        assert!(matches!(buffer.into_event(), Err(BindingError::Format(_))));
    }

    #[tokio::test]
    async fn test_copy_of_event_is_event() {
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");

        let copy = copy_message(&event, &Transformers::new()).await.unwrap();
        assert_eq!(copy.encoding(), Encoding::Event);
        assert_eq!(copy.as_event(), Some(&event));
        assert!(copy.structured().is_none());
        assert!(copy.finish(None).is_ok());

        let mut rebuilt = Event::default();
        copy.read_binary(&mut rebuilt).await.unwrap();
        copy.read_binary(&mut Event::default()).await.unwrap();
        assert_eq!(rebuilt.context(), event.context());
    }
}
