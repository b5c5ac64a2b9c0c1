//! Helpers over the engine's value type (`serde_json::Value`).

use serde_json::Value;
use std::collections::BTreeMap;

/// Resolved parameter values keyed by parameter name.
pub type ParamSet = BTreeMap<String, Value>;

/// Extract a dot-separated property (`a.b.0`) from a structured result.
///
/// Non-structured values pass through unchanged; a missing key yields `Null`.
pub fn extract_property(value: &Value, path: &str) -> Value {
    if !(value.is_object() || value.is_array()) {
        return value.clone();
    }

    let mut current = value;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Truthiness used when a non-boolean is forced into the boolean format.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Convert a float into a JSON value, mapping non-finite numbers to `Null`.
pub fn float_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Render a parameter set for the execution log.
pub fn describe_params(params: &ParamSet) -> String {
    serde_json::to_string(params).unwrap_or_else(|_| format!("{:?}", params))
}
