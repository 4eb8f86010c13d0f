//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::{Map, Value};

/// Deep merge two JSON values; `overlay` wins.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        // Arrays and scalars: no concatenation
        (_, overlay) => overlay,
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Turn `backend.kind=command` into `{"backend": {"kind": "command"}}`.
///
/// The value is read as JSON when it parses (numbers, booleans, arrays)
/// and taken as a plain string otherwise. Returns `None` when there is no
/// `=` or the key is empty.
pub fn override_from_pair(pair: &str) -> Option<Value> {
    let (path, raw) = pair.split_once('=')?;
    let path = path.trim();
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return None;
    }

    let leaf = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
    let value = path.rsplit('.').fold(leaf, |inner, key| {
        let mut map = Map::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    });
    Some(value)
}
