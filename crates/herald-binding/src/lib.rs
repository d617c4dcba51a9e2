//! Herald Binding - moving events between transports.
//!
//! This crate provides:
//! - The pull-model [`Message`] abstraction with structured and binary
//!   writers ([`message`])
//! - The encoding router: [`write`], [`direct_write`] and [`to_event`]
//! - Transformers applied while routing ([`transformer`])
//! - Completion wrappers ([`with_finish`], [`acks_before_finish`])
//! - Buffered copies of single-read messages ([`copy_message`])
//! - A header-map binding ([`HeaderMessage`], [`HeaderWriter`])
//!
//! # Example
//!
//! ```rust
//! use herald_binding::transformer::{Transformers, add_time_now};
//! use herald_binding::{Encoding, HeaderWriter, WriteContext, write};
//! use herald_core::{Event, SpecVersion};
//!
//! let mut event = Event::new(SpecVersion::V10);
//! event.set_id("1");
//! event.set_type("com.example.created");
//! event.set_source("/orders");
//!
//! let mut headers = HeaderWriter::new();
//! let transformers = Transformers::new().with(add_time_now());
//! let written = futures::executor::block_on(write(
//!     &WriteContext::new(),
//!     &event,
//!     None,
//!     Some(&mut headers),
//!     &transformers,
//! ))
//! .unwrap();
//!
//! assert_eq!(written, Encoding::Binary);
//! assert_eq!(headers.headers()["ce-id"], "1");
//! assert!(headers.headers().contains_key("ce-time"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod message;
pub mod prelude;
pub mod transformer;

mod buffering;
mod encoding;
mod error;
mod event_message;
mod finish;
mod headers;
mod to_event;
mod trace_context;
mod write;

pub use buffering::{BufferedMessage, StructuredBuffer, buffer_message, copy_message};
pub use encoding::Encoding;
pub use error::{BindingError, BindingResult, TransportError};
pub use event_message::EventMessage;
pub use finish::{AcksBeforeFinish, WithFinish, acks_before_finish, with_finish};
pub use headers::{CE_PREFIX, CONTENT_TYPE, HeaderMessage, HeaderWriter};
pub use message::{BinaryWriter, Message, MetadataReader, MetadataWriter, StructuredWriter};
pub use to_event::to_event;
pub use trace_context::{
    TracingReadTransformer, TracingWriteTransformer, tracing_write_transformer,
};
pub use transformer::{Affinity, Transformer, Transformers};
pub use write::{WriteContext, direct_write, write};
