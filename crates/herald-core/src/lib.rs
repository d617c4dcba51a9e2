//! Herald Core - the CloudEvents event model.
//!
//! This crate provides:
//! - The CloudEvents type system ([`Value`], coercions in [`value`])
//! - Spec versions and their attribute tables ([`SpecVersion`])
//! - Versioned contexts with lossless conversion ([`EventContext`])
//! - The [`Event`] type with deferred setter validation
//! - A process-wide payload codec registry ([`data`])
//! - Well-known extensions ([`extensions`])
//!
//! # Example
//!
//! ```rust
//! use herald_core::{Event, SpecVersion};
//!
//! let mut event = Event::new(SpecVersion::V10);
//! event.set_id("ABC-123");
//! event.set_type("com.example.test");
//! event.set_source("http://example.com/source");
//! event.set_data("application/json", &serde_json::json!({"a": 42})).unwrap();
//!
//! assert!(event.validate().is_ok());
//! assert_eq!(event.data(), Some(br#"{"a":42}"#.as_slice()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod content_type;
pub mod context;
pub mod data;
pub mod error;
pub mod extensions;
pub mod prelude;
pub mod spec_version;
pub mod value;

mod event;

pub use context::{ContextV03, ContextV10, EventContext};
pub use error::{
    CodecError, CodecResult, EventError, EventResult, FieldError, ValidationError, ValueError,
    ValueResult,
};
pub use event::Event;
pub use spec_version::{Attribute, AttributeKind, SpecVersion};
pub use value::{UriRef, Value, ValueKind};
