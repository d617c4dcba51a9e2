//! Structured event formats keyed by media type.
//!
//! The registry is process-wide and populated with the built-in formats on
//! first use. [`register`] installs or replaces a format; call it during
//! startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use herald_core::{Event, content_type};
use tracing::debug;

use crate::error::{FormatError, FormatResult};
use crate::json::{BatchJsonFormat, JsonFormat};
use crate::protobuf::ProtobufFormat;

/// A structured-mode event format.
pub trait Format: Send + Sync {
    /// The media type this format reads and writes.
    fn media_type(&self) -> &'static str;

    /// Encode an event.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] when the event is invalid or cannot be
    /// represented.
    fn marshal(&self, event: &Event) -> FormatResult<Vec<u8>>;

    /// Decode an event.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] when the bytes are not an event in this
    /// format.
    fn unmarshal(&self, bytes: &[u8]) -> FormatResult<Event>;
}

impl fmt::Debug for dyn Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Format").field(&self.media_type()).finish()
    }
}

static FORMATS: LazyLock<RwLock<HashMap<String, Arc<dyn Format>>>> = LazyLock::new(|| {
    let builtins: [Arc<dyn Format>; 3] = [
        Arc::new(JsonFormat),
        Arc::new(BatchJsonFormat),
        Arc::new(ProtobufFormat),
    ];
    let formats = builtins
        .into_iter()
        .map(|f| (f.media_type().to_owned(), f))
        .collect();
    RwLock::new(formats)
});

/// Install or replace a format under its media type.
pub fn register(format: Arc<dyn Format>) {
    let key = content_type::normalize(format.media_type());
    debug!(media_type = %key, "registering event format");
    FORMATS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, format);
}

/// The format for a media type. Parameters and case are ignored.
#[must_use]
pub fn lookup(media_type: &str) -> Option<Arc<dyn Format>> {
    let key = content_type::normalize(media_type);
    FORMATS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned()
}

/// Like [`lookup`], failing with [`FormatError::UnknownMediaType`].
///
/// # Errors
///
/// Returns [`FormatError::UnknownMediaType`] when no format is registered.
pub fn require(media_type: &str) -> FormatResult<Arc<dyn Format>> {
    lookup(media_type).ok_or_else(|| FormatError::UnknownMediaType(media_type.to_owned()))
}

/// Every registered media type, sorted.
#[must_use]
pub fn media_types() -> Vec<String> {
    let mut types: Vec<String> = FORMATS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    types.sort();
    types
}

/// Encode an event with the format registered for `media_type`.
///
/// # Errors
///
/// Returns [`FormatError::UnknownMediaType`] or the format's own error.
pub fn marshal(media_type: &str, event: &Event) -> FormatResult<Vec<u8>> {
    require(media_type)?.marshal(event)
}

/// Decode an event with the format registered for `media_type`.
///
/// # Errors
///
/// Returns [`FormatError::UnknownMediaType`] or the format's own error.
pub fn unmarshal(media_type: &str, bytes: &[u8]) -> FormatResult<Event> {
    require(media_type)?.unmarshal(bytes)
}
