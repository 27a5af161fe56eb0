//! YAML document reading.
//!
//! Documents are parsed into `serde_json::Value` so that every layer of
//! configuration shares one value model. File handles never outlive a single
//! read call.

use crate::error::{PkitError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Read a YAML file and optionally descend into it along `key_path`.
///
/// - A missing file yields an empty mapping when `safe` is set, and
///   `FileNotFound` otherwise.
/// - Every segment of `key_path` must exist (`KeyNotFound`), regardless of `safe`.
/// - An empty document reads as `null`.
pub fn read_yaml(path: &Path, key_path: &[&str], safe: bool) -> Result<Value> {
    if !path.is_file() {
        if safe {
            debug!(path = %path.display(), "Optional file not found, using empty mapping");
            return Ok(Value::Object(Map::new()));
        }
        return Err(PkitError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| PkitError::io(path, e))?;
    let mut value = parse_yaml(&content).map_err(|e| PkitError::invalid_document(path, e))?;

    for key in key_path {
        value = match value {
            Value::Object(mut map) => map
                .remove(*key)
                .ok_or_else(|| PkitError::key_not_found(key))?,
            _ => return Err(PkitError::key_not_found(key)),
        };
    }
    Ok(value)
}

/// Read a YAML file that must hold a mapping (or nothing at all).
pub fn read_mapping(path: &Path, safe: bool) -> Result<Map<String, Value>> {
    match read_yaml(path, &[], safe)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(PkitError::invalid_document(
            path,
            format!("expected a mapping, found {}", kind(&other)),
        )),
    }
}

/// Parse YAML text, treating a blank document as `null`.
pub fn parse_yaml(content: &str) -> std::result::Result<Value, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(content)
}

/// Short name of a value's shape, for error messages.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
