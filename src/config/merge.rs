//! Deep merge of configuration tiers.
//!
//! Higher tiers override lower ones field by field. Arrays are replaced
//! entirely and a `null` in the overlay leaves the base value untouched.

use super::types::Config;
use anyhow::Result;
use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// # Example
/// ```
/// use serde_json::json;
/// use taskdeck::config::deep_merge;
///
/// let base = json!({"server": {"port": 8080, "host": "127.0.0.1"}});
/// let overlay = json!({"server": {"port": 9000}});
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged, json!({"server": {"port": 9000, "host": "127.0.0.1"}}));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        // null means "not specified"
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

impl Config {
    /// Apply a partial overlay (e.g. command-line flags) to a loaded config.
    pub fn merged_with(&self, overlay: Value) -> Result<Config> {
        let base = serde_json::to_value(self)?;
        Ok(serde_json::from_value(deep_merge(base, overlay))?)
    }
}
