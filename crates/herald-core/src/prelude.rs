//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{
    CodecError, CodecResult, EventError, EventResult, FieldError, ValidationError, ValueError,
    ValueResult,
};

// Event model
pub use crate::{ContextV03, ContextV10, Event, EventContext};

// Attributes and values
pub use crate::{Attribute, AttributeKind, SpecVersion, UriRef, Value, ValueKind};

// Payload codecs
pub use crate::data::{Payload, PayloadSink};
