//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_format::prelude::*;` to import all essential types.

// Errors
pub use crate::{FormatError, FormatResult};

// Formats
pub use crate::{BatchJsonFormat, Format, JsonFormat, ProtobufFormat};
