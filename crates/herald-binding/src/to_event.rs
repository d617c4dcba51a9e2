//! Materializing events from messages.

use herald_core::Event;
use herald_telemetry::EventSpan;
use tracing::{debug, trace};

use crate::buffering::StructuredBuffer;
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::Message;
use crate::transformer::Transformers;

/// Read `message` into an [`Event`] and apply `transformers` to it.
///
/// Structured messages are decoded with the format registered for their
/// media type; binary messages are replayed into a fresh event. The message
/// is not finished.
///
/// # Errors
///
/// Returns [`BindingError::UnknownEncoding`] for messages of unknown
/// encoding, or the read, decode or transformer error.
pub async fn to_event(message: &dyn Message, transformers: &Transformers) -> BindingResult<Event> {
    let encoding = message.encoding();
    trace!(%encoding, "reading message into event");
    let mut event = match encoding {
        Encoding::Event => match message.as_event() {
            Some(event) => event.clone(),
            None => read_binary(message).await?,
        },
        Encoding::Structured => {
            let mut buffer = StructuredBuffer::default();
            message.read_structured(&mut buffer).await?;
            buffer.into_event()?
        },
        Encoding::Binary => read_binary(message).await?,
        Encoding::Unknown => return Err(BindingError::UnknownEncoding),
    };
    if !transformers.is_empty() {
        let span = EventSpan::from_event(&event).with_operation("transform").span();
        span.in_scope(|| {
            debug!(count = transformers.len(), "applying transformers to event");
            transformers.apply_event(&mut event)
        })?;
    }
    Ok(event)
}

async fn read_binary(message: &dyn Message) -> BindingResult<Event> {
    let mut event = Event::default();
    message.read_binary(&mut event).await?;
    Ok(event)
}
