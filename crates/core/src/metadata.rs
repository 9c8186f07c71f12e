//! Metadata normalization
//!
//! Entry metadata is reduced to loggable primitives before it is buffered:
//!
//! - top-level primitives (null, bool, number, string) pass through
//! - top-level objects and arrays keep their shape one level deep; anything
//!   nested deeper is stringified into a JSON string
//!
//! Stringification never fails: values that cannot be serialized are replaced
//! with a `[unserializable: ...]` marker.

use serde::Serialize;
use serde_json::Value;

use crate::types::Metadata;

/// Key used when non-map metadata is wrapped into a map
pub const WRAPPED_VALUE_KEY: &str = "value";

/// Serialize to a JSON string, falling back to a marker on failure.
pub fn safe_stringify<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => format!("[unserializable: {}]", e),
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Collapse a nested value into a primitive.
fn flatten(value: &Value) -> Value {
    if is_primitive(value) {
        value.clone()
    } else {
        Value::String(safe_stringify(value))
    }
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), flatten(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(flatten).collect()),
        other => other.clone(),
    }
}

/// Normalize a metadata map.
pub fn normalize_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), normalize_value(v)))
        .collect()
}

/// Normalize any serializable value into metadata.
///
/// Maps are normalized key by key. Any other value is wrapped under
/// [`WRAPPED_VALUE_KEY`]; `null` yields empty metadata.
pub fn normalize_serializable<T: Serialize + ?Sized>(value: &T) -> Metadata {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => normalize_metadata(&map),
        Ok(Value::Null) => Metadata::new(),
        Ok(other) => {
            let mut wrapped = Metadata::new();
            wrapped.insert(WRAPPED_VALUE_KEY.to_string(), normalize_value(&other));
            wrapped
        }
        Err(e) => {
            let mut wrapped = Metadata::new();
            wrapped.insert(
                WRAPPED_VALUE_KEY.to_string(),
                Value::String(format!("[unserializable: {}]", e)),
            );
            wrapped
        }
    }
}
