//! Mock messages, writers and transformers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use herald_binding::{
    Affinity, BinaryWriter, BindingError, BindingResult, Encoding, Message, MetadataReader,
    MetadataWriter, StructuredWriter, Transformer,
};
use herald_core::{Attribute, Event, Value};

/// Extension incremented by [`CountingTransformer`] on every metadata pass.
pub const HOPS_EXTENSION: &str = "hops";

#[derive(Debug, Clone)]
enum Content {
    Structured { media_type: String, body: Vec<u8> },
    Binary(Event),
    Unknown,
}

/// A transport message with observable reads and finishes.
///
/// Binary mocks replay an event; structured mocks hand out a fixed body.
/// Wrap in an `Arc` to keep access to the counters after handing the
/// message to a wrapper.
#[derive(Debug)]
pub struct MockMessage {
    content: Content,
    expose_metadata: bool,
    single_read: bool,
    reads: AtomicUsize,
    finishes: AtomicUsize,
    finish_errors: Mutex<Vec<String>>,
}

impl MockMessage {
    fn with_content(content: Content) -> Self {
        Self {
            content,
            expose_metadata: false,
            single_read: false,
            reads: AtomicUsize::new(0),
            finishes: AtomicUsize::new(0),
            finish_errors: Mutex::new(Vec::new()),
        }
    }

    /// A structured message.
    #[must_use]
    pub fn structured(media_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::with_content(Content::Structured {
            media_type: media_type.into(),
            body: body.into(),
        })
    }

    /// A structured message holding `event` as JSON.
    ///
    /// # Panics
    ///
    /// Panics when the event does not serialize.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn json(event: &Event) -> Self {
        let body = herald_format::json::encode(event).expect("fixture event must serialize");
        Self::structured(herald_core::content_type::APPLICATION_CLOUDEVENTS_JSON, body)
    }

    /// A binary message replaying `event`.
    #[must_use]
    pub fn binary(event: Event) -> Self {
        Self::with_content(Content::Binary(event))
    }

    /// A message of unknown encoding.
    #[must_use]
    pub fn unknown() -> Self {
        Self::with_content(Content::Unknown)
    }

    /// Offer a metadata reader (binary mocks only).
    #[must_use]
    pub fn with_metadata_reader(mut self) -> Self {
        self.expose_metadata = true;
        self
    }

    /// Fail every read after the first, like a consumed stream.
    #[must_use]
    pub fn read_once(mut self) -> Self {
        self.single_read = true;
        self
    }

    /// Reads so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Finish calls so far.
    #[must_use]
    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }

    /// Errors passed to finish, rendered.
    #[must_use]
    pub fn finish_errors(&self) -> Vec<String> {
        self.finish_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn begin_read(&self) -> BindingResult<()> {
        let previous = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.single_read && previous > 0 {
            return Err(BindingError::transport("message body already consumed"));
        }
        Ok(())
    }
}

#[async_trait]
impl Message for MockMessage {
    fn encoding(&self) -> Encoding {
        match self.content {
            Content::Structured { .. } => Encoding::Structured,
            Content::Binary(_) => Encoding::Binary,
            Content::Unknown => Encoding::Unknown,
        }
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        let Content::Structured { media_type, body } = &self.content else {
            return Err(BindingError::NotStructured);
        };
        self.begin_read()?;
        writer.set_structured_event(media_type, body)
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        let Content::Binary(event) = &self.content else {
            return Err(BindingError::NotBinary);
        };
        self.begin_read()?;
        event.read_binary(writer).await
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        match &self.content {
            Content::Binary(event) if self.expose_metadata => Some(event),
            _ => None,
        }
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = error {
            self.finish_errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(error.to_string());
        }
        Ok(())
    }
}

/// One callback received by a [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterCall {
    /// `start`.
    Start,
    /// `set_attribute`.
    Attribute {
        /// Wire name.
        name: String,
        /// The value, `None` for removal.
        value: Option<Value>,
    },
    /// `set_extension`.
    Extension {
        /// Extension name.
        name: String,
        /// The value, `None` for removal.
        value: Option<Value>,
    },
    /// `set_data`.
    Data(Vec<u8>),
    /// `end`.
    End,
    /// `set_structured_event`.
    Structured {
        /// Media type.
        media_type: String,
        /// Body.
        body: Vec<u8>,
    },
}

/// A writer of both modes that records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter {
    calls: Vec<WriterCall>,
}

impl RecordingWriter {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every callback, in order.
    #[must_use]
    pub fn calls(&self) -> &[WriterCall] {
        &self.calls
    }

    /// Attribute and extension names, in order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                WriterCall::Attribute { name, .. } | WriterCall::Extension { name, .. } => {
                    Some(name.as_str())
                },
                _ => None,
            })
            .collect()
    }

    /// The last value set for an extension.
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.calls.iter().rev().find_map(|call| match call {
            WriterCall::Extension { name: n, value } if n == name => value.as_ref(),
            _ => None,
        })
    }

    /// The structured body, when one was written.
    #[must_use]
    pub fn structured(&self) -> Option<(&str, &[u8])> {
        self.calls.iter().find_map(|call| match call {
            WriterCall::Structured { media_type, body } => {
                Some((media_type.as_str(), body.as_slice()))
            },
            _ => None,
        })
    }

    /// The binary payload, when one was written.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.calls.iter().find_map(|call| match call {
            WriterCall::Data(data) => Some(data.as_slice()),
            _ => None,
        })
    }
}

impl MetadataWriter for RecordingWriter {
    fn set_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> BindingResult<()> {
        self.calls.push(WriterCall::Attribute {
            name: attribute.name().to_owned(),
            value,
        });
        Ok(())
    }

    fn set_extension(&mut self, name: &str, value: Option<Value>) -> BindingResult<()> {
        self.calls.push(WriterCall::Extension {
            name: name.to_owned(),
            value,
        });
        Ok(())
    }
}

impl BinaryWriter for RecordingWriter {
    fn start(&mut self) -> BindingResult<()> {
        self.calls.push(WriterCall::Start);
        Ok(())
    }

    fn set_data(&mut self, data: &[u8]) -> BindingResult<()> {
        self.calls.push(WriterCall::Data(data.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> BindingResult<()> {
        self.calls.push(WriterCall::End);
        Ok(())
    }
}

impl StructuredWriter for RecordingWriter {
    fn set_structured_event(&mut self, media_type: &str, body: &[u8]) -> BindingResult<()> {
        self.calls.push(WriterCall::Structured {
            media_type: media_type.to_owned(),
            body: body.to_vec(),
        });
        Ok(())
    }
}

/// A transformer that counts its invocations.
///
/// Metadata passes increment the [`HOPS_EXTENSION`] extension; structured
/// passes leave the body alone.
#[derive(Debug, Clone)]
pub struct CountingTransformer {
    affinity: Affinity,
    calls: Arc<AtomicUsize>,
}

impl CountingTransformer {
    /// A counter with the given affinity.
    #[must_use]
    pub fn new(affinity: Affinity) -> Self {
        Self {
            affinity,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Invocations so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn next_hop(current: Option<Value>) -> Value {
    let hops = current.and_then(|v| v.as_integer()).unwrap_or(0);
    Value::Integer(hops.saturating_add(1))
}

impl Transformer for CountingTransformer {
    fn name(&self) -> &str {
        "counting"
    }

    fn affinity(&self) -> Affinity {
        self.affinity
    }

    fn transform_structured(&self, _media_type: &str, _body: &mut Vec<u8>) -> BindingResult<()> {
        self.hit();
        Ok(())
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        self.hit();
        writer.set_extension(HOPS_EXTENSION, Some(next_hop(reader.extension(HOPS_EXTENSION))))
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        if self.affinity.contains(Affinity::EVENT) {
            self.hit();
            let hops = next_hop(event.extension(HOPS_EXTENSION).cloned());
            event.set_extension(HOPS_EXTENSION, hops);
            return Ok(());
        }
        if self.affinity.contains(Affinity::BINARY) {
            let snapshot = event.context().clone();
            return self.transform_metadata(&snapshot, event);
        }
        Err(BindingError::Affinity {
            name: self.name().to_owned(),
            mode: "event",
        })
    }
}
