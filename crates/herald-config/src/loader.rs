//! Layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, when one is given
//! 3. Apply `HERALD_*` env var fallbacks for fields the file left unset
//! 4. Deserialize the merged tree → `Config`
//! 5. Validate

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, leaf_paths};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Load configuration using the current process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if the
/// merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Load configuration with an explicit set of environment variables.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;

    let file_fields = match path {
        Some(path) => {
            let shown = path.display().to_string();
            let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: shown.clone(),
                source: e,
            })?;
            let overlay = parse(&contents, &shown)?;
            deep_merge(&mut merged, &overlay);
            info!(path = %shown, "loaded config file");
            leaf_paths(&overlay)
        },
        None => HashSet::new(),
    };

    let applied = apply_env_fallbacks(&mut merged, &file_fields, env_vars);
    debug!(applied, "environment fallbacks applied");

    let config: Config = merged
        .try_into()
        .map_err(|e| ConfigError::ParseError {
            path: "<merged>".to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Parse and validate a configuration from a TOML string, on top of the
/// defaults. Environment variables are not consulted.
///
/// # Errors
///
/// See [`load`].
pub fn from_toml_str(contents: &str) -> ConfigResult<Config> {
    let mut merged = parse(DEFAULTS_TOML, "<embedded defaults>")?;
    deep_merge(&mut merged, &parse(contents, "<string>")?);
    let config: Config = merged
        .try_into()
        .map_err(|e| ConfigError::ParseError {
            path: "<string>".to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

fn parse(contents: &str, path: &str) -> ConfigResult<toml::Value> {
    toml::from_str(contents).map_err(|e| ConfigError::ParseError {
        path: path.to_owned(),
        source: e,
    })
}
