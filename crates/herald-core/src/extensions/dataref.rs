//! The `dataref` extension (claim-check pattern).

use crate::error::EventResult;
use crate::event::Event;
use crate::value::{UriRef, Value, to_uri_ref};

/// Extension name.
pub const DATAREF: &str = "dataref";

/// A reference to where the payload is stored instead of the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRefExtension {
    /// Location of the payload.
    pub data_ref: UriRef,
}

impl DataRefExtension {
    /// Parse a reference.
    ///
    /// # Errors
    ///
    /// Returns the URI-reference parse error.
    pub fn new(data_ref: &str) -> EventResult<Self> {
        Ok(Self {
            data_ref: UriRef::parse(data_ref)?,
        })
    }

    /// Read the extension from an event. Values that do not parse as a
    /// URI-reference are ignored.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        let data_ref = to_uri_ref(event.extension(DATAREF)?).ok()?;
        Some(Self { data_ref })
    }

    /// Write the extension onto an event.
    pub fn add_to(&self, event: &mut Event) {
        event.set_extension(DATAREF, Value::UriRef(self.data_ref.clone()));
    }
}
