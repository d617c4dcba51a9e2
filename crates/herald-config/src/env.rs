//! Environment variable fallbacks.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `HERALD_*` mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HERALD_LOG_LEVEL",
        field_path: "log.level",
    },
    EnvMapping {
        var_name: "HERALD_LOG_FORMAT",
        field_path: "log.format",
    },
    EnvMapping {
        var_name: "HERALD_SPEC_VERSION",
        field_path: "event.spec_version",
    },
    EnvMapping {
        var_name: "HERALD_EVENT_ENCODING",
        field_path: "binding.preferred_encoding",
    },
    EnvMapping {
        var_name: "HERALD_STRUCTURED_MEDIA_TYPE",
        field_path: "binding.structured_media_type",
    },
];

/// Snapshot the `HERALD_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("HERALD_"))
        .collect()
}

/// Apply environment fallbacks to fields not in `file_fields`.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    file_fields: &HashSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if file_fields.contains(mapping.field_path) {
            continue;
        }
        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field(merged, mapping.field_path, val);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a string field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: &str) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml::Value::String(val.to_owned()));
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml::Value::String(val.to_owned()));
    }
}
