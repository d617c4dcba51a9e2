//! Layer merging.

use std::collections::HashSet;

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay replace the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Dotted paths of every leaf in a TOML tree (e.g. `"log.level"`).
#[must_use]
pub fn leaf_paths(value: &toml::Value) -> HashSet<String> {
    let mut paths = HashSet::new();
    collect_leaves(value, "", &mut paths);
    paths
}

fn collect_leaves(value: &toml::Value, prefix: &str, paths: &mut HashSet<String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, &path, paths);
            }
        },
        _ => {
            paths.insert(prefix.to_owned());
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_deep_merge_keeps_unset_fields() {
        let mut base = parse("[log]\nlevel = \"info\"\nformat = \"compact\"\n");
        deep_merge(&mut base, &parse("[log]\nlevel = \"debug\"\n"));
        assert_eq!(base["log"]["level"].as_str(), Some("debug"));
        assert_eq!(base["log"]["format"].as_str(), Some("compact"));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[log]\ndirectives = [\"a\", \"b\"]\n");
        deep_merge(&mut base, &parse("[log]\ndirectives = [\"c\"]\n"));
        assert_eq!(base["log"]["directives"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_leaf_paths() {
        let paths = leaf_paths(&parse("[log]\nlevel = \"debug\"\n[event]\nspec_version = \"0.3\"\n"));
        assert!(paths.contains("log.level"));
        assert!(paths.contains("event.spec_version"));
        assert_eq!(paths.len(), 2);
    }
}
