//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_binding::prelude::*;` to import all essential types.

// Errors
pub use crate::{BindingError, BindingResult};

// Messages
pub use crate::{
    BinaryWriter, Encoding, EventMessage, Message, MetadataReader, MetadataWriter,
    StructuredWriter,
};

// Routing
pub use crate::{WriteContext, direct_write, to_event, write};

// Transformers
pub use crate::{Affinity, Transformer, Transformers};
