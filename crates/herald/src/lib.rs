//! Herald - CloudEvents for Rust.
//!
//! This crate re-exports the Herald crates and provides a single import for
//! the commonly used types:
//!
//! - [`core`] (`herald-core`): values, contexts, events, data codecs
//! - [`format`] (`herald-format`): JSON and protobuf event formats
//! - [`binding`] (`herald-binding`): messages, routing, transformers
//! - [`config`] (`herald-config`): layered TOML configuration
//! - [`telemetry`] (`herald-telemetry`): logging setup
//!
//! # Example
//!
//! ```rust
//! use herald::prelude::*;
//!
//! let config = Config::from_toml("[event]\nspec_version = \"0.3\"").unwrap();
//! let mut event = herald::new_event(&config).unwrap();
//! event.set_id("1");
//! event.set_type("com.example.created");
//! event.set_source("/orders");
//!
//! let body = JsonFormat.marshal(&event).unwrap();
//! assert_eq!(JsonFormat.unmarshal(&body).unwrap(), event);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub use herald_binding as binding;
pub use herald_config as config;
pub use herald_core as core;
pub use herald_format as format;
pub use herald_telemetry as telemetry;

use herald_binding::{BindingError, WriteContext};
use herald_config::Config;
use herald_core::{Event, EventError, SpecVersion};
use herald_telemetry::{LogConfig, TelemetryError};
use thiserror::Error;

/// Errors from [`setup`] and [`new_event`].
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The `[binding]` section is unusable.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The `[event]` section is unusable.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Result type for [`setup`] and [`new_event`].
pub type HeraldResult<T> = Result<T, HeraldError>;

/// Install logging from `[log]` and build the routing context from
/// `[binding]`.
///
/// # Errors
///
/// Returns [`HeraldError::Telemetry`] when logging is already installed or
/// misconfigured, and [`HeraldError::Binding`] for a bad `[binding]`
/// section.
pub fn setup(config: &Config) -> HeraldResult<WriteContext> {
    herald_telemetry::setup_logging(&LogConfig::from_section(&config.log)?)?;
    Ok(WriteContext::from_config(config)?)
}

/// An empty event of the configured spec version.
///
/// # Errors
///
/// Returns [`HeraldError::Event`] for an unknown spec version.
pub fn new_event(config: &Config) -> HeraldResult<Event> {
    let version: SpecVersion = config.event.spec_version.parse()?;
    Ok(Event::new(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_uses_configured_version() {
        let event = new_event(&Config::default()).unwrap();
        assert_eq!(event.spec_version(), SpecVersion::V10);

        let mut config = Config::default();
        config.event.spec_version = "0.2".to_owned();
        assert!(matches!(new_event(&config), Err(HeraldError::Event(_))));
    }

    #[test]
    fn test_setup_rejects_bad_log_level() {
        let mut config = Config::default();
        config.log.level = "[bad".to_owned();
        assert!(matches!(setup(&config), Err(HeraldError::Telemetry(_))));
    }
}
