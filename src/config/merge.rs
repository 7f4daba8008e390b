//! Deep merge and secret promotion for composed configuration trees.
//!
//! Implements field-by-field merging where later values override earlier ones.
//! Sequences are replaced entirely, not concatenated.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Name of the top-level section whose members get promoted to the root.
pub const SECRETS_KEY: &str = "secrets";

/// Deep merge two YAML values, with `overlay` taking precedence over `base`.
///
/// - Mappings are merged recursively: keys in overlay override keys in base,
///   new keys are appended after the existing ones
/// - Sequences, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
///
/// # Example
/// ```
/// use hydra_buddies::config::deep_merge;
///
/// let base: serde_yaml::Value = serde_yaml::from_str("db: {port: 5432, host: localhost}").unwrap();
/// let overlay: serde_yaml::Value = serde_yaml::from_str("db: {port: 6543}").unwrap();
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged["db"]["port"].as_u64(), Some(6543));
/// assert_eq!(merged["db"]["host"].as_str(), Some("localhost"));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are mappings: merge recursively, keeping base key order
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Mapping(base_map)
        }
        // Overlay is null: preserve base
        (base, Value::Null) => base,
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

/// Lift each `secrets.<section>` up to the root of `tree`.
///
/// A section missing at the root is inserted as-is. When both sides are
/// mappings, only keys the root section lacks are copied; root keys win.
/// Anything else at the root is left untouched.
pub fn promote_secrets(tree: &mut Value) {
    let Value::Mapping(root) = tree else {
        return;
    };
    let Some(Value::Mapping(secrets)) = root.get(SECRETS_KEY).cloned() else {
        return;
    };

    for (section, values) in secrets {
        match root.get_mut(&section) {
            None => {
                debug!(section = ?section, "Promoting secret section to root");
                root.insert(section, values);
            }
            Some(Value::Mapping(existing)) => {
                if let Value::Mapping(values) = values {
                    fill_missing(existing, values);
                }
            }
            Some(_) => {}
        }
    }
}

fn fill_missing(target: &mut Mapping, source: Mapping) {
    for (key, value) in source {
        if !target.contains_key(&key) {
            target.insert(key, value);
        }
    }
}
