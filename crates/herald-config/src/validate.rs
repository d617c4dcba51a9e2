//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_log(config)?;
    validate_event(config)?;
    validate_binding(config)?;
    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    }
}

fn validate_log(config: &Config) -> ConfigResult<()> {
    let log = &config.log;
    if !matches!(
        log.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "log.level",
            format!("unknown level '{}'; expected one of: trace, debug, info, warn, error", log.level),
        ));
    }
    if !matches!(log.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "log.format",
            format!("unknown format '{}'; expected one of: pretty, compact, json, full", log.format),
        ));
    }
    match log.target.as_str() {
        "stdout" | "stderr" => {},
        "file" if log.file.as_deref().is_some_and(|f| !f.is_empty()) => {},
        "file" => {
            return Err(invalid("log.file", "required when log.target is 'file'".to_owned()));
        },
        other => {
            return Err(invalid(
                "log.target",
                format!("unknown target '{other}'; expected one of: stdout, stderr, file"),
            ));
        },
    }
    Ok(())
}

fn validate_event(config: &Config) -> ConfigResult<()> {
    if !matches!(config.event.spec_version.as_str(), "1.0" | "0.3") {
        return Err(invalid(
            "event.spec_version",
            format!("unsupported spec version '{}'; expected 1.0 or 0.3", config.event.spec_version),
        ));
    }
    Ok(())
}

fn validate_binding(config: &Config) -> ConfigResult<()> {
    let binding = &config.binding;
    if !matches!(binding.preferred_encoding.as_str(), "binary" | "structured") {
        return Err(invalid(
            "binding.preferred_encoding",
            format!(
                "unknown encoding '{}'; expected binary or structured",
                binding.preferred_encoding
            ),
        ));
    }
    if binding.structured_media_type.trim().is_empty() {
        return Err(invalid(
            "binding.structured_media_type",
            "must not be empty".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_rejects_unknown_values() {
        let mut config = Config::default();
        config.event.spec_version = "2.0".to_owned();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { field, .. }) if field == "event.spec_version"
        ));

        let mut config = Config::default();
        config.binding.preferred_encoding = "event".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.log.target = "file".to_owned();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { field, .. }) if field == "log.file"
        ));
    }
}
