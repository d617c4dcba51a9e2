//! Message encodings.

use std::fmt;

/// How a message carries its event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Not determined.
    #[default]
    Unknown,
    /// Attributes in transport metadata, payload in the body.
    Binary,
    /// The whole event serialized into the body by an event format.
    Structured,
    /// An in-memory [`Event`](herald_core::Event).
    Event,
}

impl Encoding {
    /// Parse `"binary"` or `"structured"`, as used in configuration.
    #[must_use]
    pub fn from_config(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Some(Self::Binary),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Binary => "binary",
            Self::Structured => "structured",
            Self::Event => "event",
        })
    }
}
