//! Events as messages.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::Event;
use herald_format::{Format, JsonFormat};

use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{
    BinaryWriter, Message, MetadataReader, StructuredWriter, write_event_binary,
    write_event_structured,
};

/// An event read as a message. Structured reads use the JSON format.
#[async_trait]
impl Message for Event {
    fn encoding(&self) -> Encoding {
        Encoding::Event
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        write_event_structured(self, &JsonFormat, writer)
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        write_event_binary(self, writer)
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        Some(self)
    }

    fn as_event(&self) -> Option<&Event> {
        Some(self)
    }

    fn finish(&self, _error: Option<BindingError>) -> BindingResult<()> {
        Ok(())
    }
}

/// An event paired with the format used for structured reads.
#[derive(Debug, Clone)]
pub struct EventMessage {
    event: Event,
    format: Arc<dyn Format>,
}

impl EventMessage {
    /// Wrap an event. Structured reads use `format`.
    #[must_use]
    pub fn new(event: Event, format: Arc<dyn Format>) -> Self {
        Self { event, format }
    }

    /// The wrapped event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Unwrap the event.
    #[must_use]
    pub fn into_event(self) -> Event {
        self.event
    }
}

impl From<Event> for EventMessage {
    fn from(event: Event) -> Self {
        Self::new(event, Arc::new(JsonFormat))
    }
}

#[async_trait]
impl Message for EventMessage {
    fn encoding(&self) -> Encoding {
        Encoding::Event
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        write_event_structured(&self.event, self.format.as_ref(), writer)
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        write_event_binary(&self.event, writer)
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        Some(&self.event)
    }

    fn as_event(&self) -> Option<&Event> {
        Some(&self.event)
    }

    fn finish(&self, _error: Option<BindingError>) -> BindingResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SpecVersion;
    use herald_core::content_type::{APPLICATION_CLOUDEVENTS_JSON, APPLICATION_CLOUDEVENTS_PROTOBUF};
    use herald_format::ProtobufFormat;

    #[derive(Default)]
    struct Body(Option<(String, Vec<u8>)>);

    impl StructuredWriter for Body {
        fn set_structured_event(&mut self, media_type: &str, body: &[u8]) -> BindingResult<()> {
            self.0 = Some((media_type.to_owned(), body.to_vec()));
            Ok(())
        }
    }

    fn event() -> Event {
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event
    }

    #[tokio::test]
    async fn test_event_reads_as_json() {
        let event = event();
        assert_eq!(event.encoding(), Encoding::Event);
        let mut body = Body::default();
        event.read_structured(&mut body).await.unwrap();
        let (media_type, bytes) = body.0.unwrap();
        assert_eq!(media_type, APPLICATION_CLOUDEVENTS_JSON);
        assert_eq!(herald_format::json::decode(&bytes).unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_message_uses_its_format() {
        let message = EventMessage::new(event(), Arc::new(ProtobufFormat));
        let mut body = Body::default();
        message.read_structured(&mut body).await.unwrap();
        let (media_type, bytes) = body.0.unwrap();
        assert_eq!(media_type, APPLICATION_CLOUDEVENTS_PROTOBUF);
        assert_eq!(herald_format::protobuf::decode(&bytes).unwrap(), *message.event());
        assert!(message.finish(None).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_event_fails_structured_read() {
        let mut body = Body::default();
        let err = Event::new(SpecVersion::V10)
            .read_structured(&mut body)
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::Format(_)));
    }
}
