//! Shallow merging and value substitution for configuration mappings.
//!
//! Merges are top-level only: a key in the overlay replaces the base value
//! wholesale, nested mappings included. Substitution is a single pass; a
//! replacement that is itself a key is not substituted again.

use serde_json::{Map, Value};

/// Merge `overlay` into `base`, overlay keys taking precedence.
///
/// # Example
/// ```
/// use serde_json::json;
/// use project_kit::config::shallow_merge;
///
/// let mut base = json!({"server": {"host": "localhost", "port": 8080}, "debug": true});
/// let overlay = json!({"server": {"port": 9000}});
/// shallow_merge(base.as_object_mut().unwrap(), overlay.as_object().unwrap().clone());
/// assert_eq!(base, json!({"server": {"port": 9000}, "debug": true}));
/// ```
pub fn shallow_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

/// Merge several mappings in order, with later mappings taking precedence.
pub fn shallow_merge_all(values: impl IntoIterator<Item = Map<String, Value>>) -> Map<String, Value> {
    values.into_iter().fold(Map::new(), |mut acc, overlay| {
        shallow_merge(&mut acc, overlay);
        acc
    })
}

/// Replace every string in `value` that is a key of `reference` with that key's value.
///
/// - Mappings and sequences are walked recursively (mapping keys are untouched).
/// - Strings are replaced when `reference` contains them as a key.
/// - Other scalars are returned unchanged.
pub fn substitute(value: &Value, reference: &Map<String, Value>) -> Value {
    match value {
        Value::Object(map) => Value::Object(substitute_map(map, reference)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, reference)).collect()),
        Value::String(s) => reference.get(s).cloned().unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// `substitute` applied to each value of a mapping.
pub fn substitute_map(map: &Map<String, Value>, reference: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), substitute(v, reference)))
        .collect()
}
