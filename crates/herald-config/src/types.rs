//! Configuration types.
//!
//! These types mirror the domain types of the other herald crates as plain
//! strings and flags; conversion happens in the consuming crate. Every struct
//! implements [`Default`] with the same values as `defaults.toml`, so a bare
//! `[section]` header produces a working configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level, format and output.
    pub log: LogSection,
    /// Event construction defaults.
    pub event: EventSection,
    /// Message routing defaults.
    pub binding: BindingSection,
}

// ---------------------------------------------------------------------------
// LogSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Output target: `"stdout"`, `"stderr"` or `"file"`.
    pub target: String,
    /// Log file path when `target = "file"`.
    pub file: Option<String>,
    /// Per-crate directives (e.g. `["herald_binding=trace"]`).
    pub directives: Vec<String>,
    /// Colored output.
    pub ansi: bool,
    /// Timestamps on each line.
    pub timestamps: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            file: None,
            directives: Vec::new(),
            ansi: true,
            timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// EventSection
// ---------------------------------------------------------------------------

/// Event construction defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSection {
    /// Spec version of new events: `"1.0"` or `"0.3"`.
    pub spec_version: String,
}

impl Default for EventSection {
    fn default() -> Self {
        Self {
            spec_version: "1.0".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// BindingSection
// ---------------------------------------------------------------------------

/// Routing defaults used when writing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSection {
    /// Encoding used when an event has to be written out: `"binary"` or
    /// `"structured"`.
    pub preferred_encoding: String,
    /// Media type of the structured format used for events.
    pub structured_media_type: String,
    /// Never pass structured messages through unchanged.
    pub skip_direct_structured: bool,
    /// Never pass binary messages through unchanged.
    pub skip_direct_binary: bool,
}

impl Default for BindingSection {
    fn default() -> Self {
        Self {
            preferred_encoding: "binary".to_owned(),
            structured_media_type: "application/cloudevents+json".to_owned(),
            skip_direct_structured: false,
            skip_direct_binary: false,
        }
    }
}
