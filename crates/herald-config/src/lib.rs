//! Layered configuration for Herald.
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("herald.toml"))).unwrap();
//! println!("new events use spec version {}", config.event.spec_version);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** passed to [`Config::load`]
//! 2. **Environment variables** (`HERALD_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other herald crates. Conversion to
//! domain types happens in the consuming crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Layered loading.
pub mod loader;
/// Layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration: defaults, then the optional file, then
    /// `HERALD_*` environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or malformed, or
    /// the final configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse a configuration from TOML text layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is malformed or invalid.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        loader::from_toml_str(contents)
    }
}
