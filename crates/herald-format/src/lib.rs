//! Herald Format - structured CloudEvents encodings.
//!
//! This crate provides:
//! - The JSON event format and its batch variant ([`json`])
//! - The protobuf event format ([`protobuf`])
//! - A process-wide media type to [`Format`] registry ([`registry`])
//!
//! # Example
//!
//! ```rust
//! use herald_format::registry;
//!
//! let input = br#"{"specversion":"1.0","id":"1","type":"t","source":"/s"}"#;
//! let event = registry::unmarshal("application/cloudevents+json", input).unwrap();
//! assert_eq!(event.id(), "1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod json;
pub mod prelude;
pub mod protobuf;
pub mod registry;

pub use error::{FormatError, FormatResult};
pub use json::{BatchJsonFormat, JsonFormat};
pub use protobuf::ProtobufFormat;
pub use registry::Format;
