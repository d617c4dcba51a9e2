//! Routing a message to writers.
//!
//! [`write`] moves a message to whichever of a structured and a binary
//! writer fits, choosing the cheapest path:
//!
//! 1. A structured message goes to the structured writer unchanged, when
//!    every transformer can rewrite serialized bodies.
//! 2. A binary message is replayed into the binary writer, when every
//!    transformer can rewrite attributes.
//! 3. Anything else is materialized as an event, transformed, and written
//!    in the preferred encoding.

use std::future::Future;
use std::sync::Arc;

use herald_config::{BindingSection, Config};
use herald_core::{Attribute, Event, EventContext, Value};
use herald_format::{Format, JsonFormat, registry};
use herald_telemetry::EventSpan;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::buffering::StructuredBuffer;
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{
    BinaryWriter, Message, MetadataWriter, StructuredWriter, write_event_binary,
    write_event_structured,
};
use crate::to_event::to_event;
use crate::transformer::{Affinity, Transformers};

/// Options for [`write`] and [`direct_write`].
#[derive(Debug, Clone)]
pub struct WriteContext {
    /// Encoding used when an event has to be written out.
    pub preferred_encoding: Encoding,
    /// Format used for structured output of events.
    pub event_format: Arc<dyn Format>,
    /// Never pass structured messages through.
    pub skip_direct_structured: bool,
    /// Never pass binary messages through.
    pub skip_direct_binary: bool,
    /// Cancels an in-flight write.
    pub cancel: CancellationToken,
}

impl Default for WriteContext {
    fn default() -> Self {
        Self {
            preferred_encoding: Encoding::Binary,
            event_format: Arc::new(JsonFormat),
            skip_direct_structured: false,
            skip_direct_binary: false,
            cancel: CancellationToken::new(),
        }
    }
}

impl WriteContext {
    /// Binary output, JSON events, no skips.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[binding]` section of a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Config`] for an unknown encoding and
    /// [`BindingError::Format`] when no format is registered for the
    /// structured media type.
    pub fn from_section(section: &BindingSection) -> BindingResult<Self> {
        let preferred_encoding = Encoding::from_config(&section.preferred_encoding).ok_or_else(|| {
            BindingError::Config(format!("unknown encoding '{}'", section.preferred_encoding))
        })?;
        Ok(Self {
            preferred_encoding,
            event_format: registry::require(&section.structured_media_type)?,
            skip_direct_structured: section.skip_direct_structured,
            skip_direct_binary: section.skip_direct_binary,
            cancel: CancellationToken::new(),
        })
    }

    /// Build from a full configuration.
    ///
    /// # Errors
    ///
    /// See [`WriteContext::from_section`].
    pub fn from_config(config: &Config) -> BindingResult<Self> {
        Self::from_section(&config.binding)
    }

    /// Set the preferred encoding.
    #[must_use]
    pub fn with_preferred_encoding(mut self, encoding: Encoding) -> Self {
        self.preferred_encoding = encoding;
        self
    }

    /// Set the structured event format.
    #[must_use]
    pub fn with_event_format(mut self, format: Arc<dyn Format>) -> Self {
        self.event_format = format;
        self
    }

    /// Disable structured pass-through.
    #[must_use]
    pub fn skip_direct_structured(mut self) -> Self {
        self.skip_direct_structured = true;
        self
    }

    /// Disable binary pass-through.
    #[must_use]
    pub fn skip_direct_binary(mut self) -> Self {
        self.skip_direct_binary = true;
        self
    }

    /// Use `token` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Write `message` without materializing an event, when possible.
///
/// Returns the encoding written, or [`Encoding::Unknown`] when neither
/// pass-through applies. On cancellation the message is finished with
/// [`BindingError::Cancelled`].
///
/// # Errors
///
/// Returns [`BindingError::Cancelled`], or the read, transform or writer
/// error.
pub async fn direct_write(
    ctx: &WriteContext,
    message: &dyn Message,
    structured: Option<&mut (dyn StructuredWriter + '_)>,
    binary: Option<&mut (dyn BinaryWriter + '_)>,
    transformers: &Transformers,
) -> BindingResult<Encoding> {
    cancellable(
        ctx,
        message,
        direct_write_unguarded(ctx, message, structured, binary, transformers),
    )
    .await
}

/// Write `message` to one of the writers.
///
/// Tries [`direct_write`] first, unless the message is an event. Otherwise
/// the message becomes an event, `transformers` are applied, and the event
/// is written in `ctx.preferred_encoding`, or the other encoding when only
/// that writer is present. The message is not finished on success.
///
/// # Errors
///
/// Returns [`BindingError::UnknownEncoding`] when no writer is given,
/// [`BindingError::Cancelled`], or the read, transform or writer error.
pub async fn write(
    ctx: &WriteContext,
    message: &dyn Message,
    structured: Option<&mut (dyn StructuredWriter + '_)>,
    binary: Option<&mut (dyn BinaryWriter + '_)>,
    transformers: &Transformers,
) -> BindingResult<Encoding> {
    cancellable(
        ctx,
        message,
        write_unguarded(ctx, message, structured, binary, transformers),
    )
    .await
}

async fn cancellable<T>(
    ctx: &WriteContext,
    message: &dyn Message,
    work: impl Future<Output = BindingResult<T>>,
) -> BindingResult<T> {
    tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => {
            debug!("write cancelled");
            if let Err(e) = message.finish(Some(BindingError::Cancelled)) {
                warn!(error = %e, "finishing cancelled message failed");
            }
            Err(BindingError::Cancelled)
        },
        result = work => result,
    }
}

pub(crate) async fn direct_write_unguarded(
    ctx: &WriteContext,
    message: &dyn Message,
    structured: Option<&mut (dyn StructuredWriter + '_)>,
    binary: Option<&mut (dyn BinaryWriter + '_)>,
    transformers: &Transformers,
) -> BindingResult<Encoding> {
    let encoding = message.encoding();

    if encoding == Encoding::Structured
        && !ctx.skip_direct_structured
        && transformers.supports(Affinity::STRUCTURED)
        && let Some(writer) = structured
    {
        debug!(transformers = transformers.len(), "direct structured write");
        write_structured(message, writer, transformers).await?;
        return Ok(Encoding::Structured);
    }

    if encoding == Encoding::Binary
        && !ctx.skip_direct_binary
        && transformers.supports(Affinity::BINARY)
        && let Some(writer) = binary
    {
        debug!(transformers = transformers.len(), "direct binary write");
        write_binary(message, writer, transformers).await?;
        return Ok(Encoding::Binary);
    }

    trace!(%encoding, "no direct write path");
    Ok(Encoding::Unknown)
}

async fn write_unguarded(
    ctx: &WriteContext,
    message: &dyn Message,
    mut structured: Option<&mut (dyn StructuredWriter + '_)>,
    mut binary: Option<&mut (dyn BinaryWriter + '_)>,
    transformers: &Transformers,
) -> BindingResult<Encoding> {
    if message.encoding() != Encoding::Event {
        let written = direct_write_unguarded(
            ctx,
            message,
            structured.as_deref_mut(),
            binary.as_deref_mut(),
            transformers,
        )
        .await?;
        if written != Encoding::Unknown {
            return Ok(written);
        }
    }

    let event = to_event(message, transformers).await?;
    write_event(ctx, &event, structured, binary)
}

fn write_event(
    ctx: &WriteContext,
    event: &Event,
    structured: Option<&mut (dyn StructuredWriter + '_)>,
    binary: Option<&mut (dyn BinaryWriter + '_)>,
) -> BindingResult<Encoding> {
    let span = EventSpan::from_event(event).with_operation("write").span();
    let _entered = span.enter();
    let prefer_structured = ctx.preferred_encoding == Encoding::Structured;
    match (structured, binary) {
        (Some(writer), _) if prefer_structured => emit_structured(ctx, event, writer),
        (_, Some(writer)) => emit_binary(event, writer),
        (Some(writer), None) => emit_structured(ctx, event, writer),
        (None, None) => Err(BindingError::UnknownEncoding),
    }
}

fn emit_structured(
    ctx: &WriteContext,
    event: &Event,
    writer: &mut dyn StructuredWriter,
) -> BindingResult<Encoding> {
    debug!(format = ctx.event_format.media_type(), "writing event structured");
    write_event_structured(event, ctx.event_format.as_ref(), writer)?;
    Ok(Encoding::Structured)
}

fn emit_binary(event: &Event, writer: &mut dyn BinaryWriter) -> BindingResult<Encoding> {
    debug!("writing event binary");
    writer.start()?;
    write_event_binary(event, writer)?;
    writer.end()?;
    Ok(Encoding::Binary)
}

async fn write_structured(
    message: &dyn Message,
    writer: &mut dyn StructuredWriter,
    transformers: &Transformers,
) -> BindingResult<()> {
    if transformers.is_empty() {
        return message.read_structured(writer).await;
    }
    let mut buffer = StructuredBuffer::default();
    message.read_structured(&mut buffer).await?;
    let (media_type, mut body) = buffer.into_parts()?;
    transformers.apply_structured(&media_type, &mut body)?;
    writer.set_structured_event(&media_type, &body)
}

async fn write_binary(
    message: &dyn Message,
    writer: &mut dyn BinaryWriter,
    transformers: &Transformers,
) -> BindingResult<()> {
    writer.start()?;
    if transformers.is_empty() {
        message.read_binary(writer).await?;
    } else if let Some(reader) = message.metadata_reader() {
        message.read_binary(writer).await?;
        transformers.apply_metadata(reader, writer)?;
    } else {
        let mut capture = Capture::new(&mut *writer);
        message.read_binary(&mut capture).await?;
        let Capture { inner, context } = capture;
        transformers.apply_metadata(&context, inner)?;
    }
    writer.end()
}

/// Forwards binary callbacks while recording the attributes, so that
/// transformers can read them afterwards.
struct Capture<'a> {
    inner: &'a mut dyn BinaryWriter,
    context: EventContext,
}

impl<'a> Capture<'a> {
    fn new(inner: &'a mut dyn BinaryWriter) -> Self {
        Self {
            inner,
            context: EventContext::default(),
        }
    }
}

impl MetadataWriter for Capture<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> BindingResult<()> {
        if let Err(e) = self.context.set(attribute.kind(), value.clone()) {
            trace!(attribute = attribute.name(), error = %e, "attribute not captured");
        }
        self.inner.set_attribute(attribute, value)
    }

    fn set_extension(&mut self, name: &str, value: Option<Value>) -> BindingResult<()> {
        match &value {
            Some(v) => {
                self.context
                    .extensions_mut()
                    .insert(name.to_ascii_lowercase(), v.clone());
            },
            None => {
                self.context.remove_extension(name);
            },
        }
        self.inner.set_extension(name, value)
    }
}

impl BinaryWriter for Capture<'_> {
    fn set_data(&mut self, data: &[u8]) -> BindingResult<()> {
        self.inner.set_data(data)
    }
}
