//! Rhai engine creation and value conversion.
//!
//! Script calculations and helper functions both run on Rhai. Values cross
//! the boundary as `serde_json::Value` on the engine side and `Dynamic` on the
//! Rhai side.

use rhai::{Dynamic, Engine};
use serde_json::Value;

use super::log::ExecutionLog;

/// Operation budget per evaluation; stops runaway loops in user code.
const MAX_OPERATIONS: u64 = 50_000_000;
const MAX_CALL_LEVELS: usize = 64;

/// Create a Rhai engine with calcbook's limits applied.
pub fn create_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(MAX_OPERATIONS);
    engine.set_max_call_levels(MAX_CALL_LEVELS);
    engine
}

/// Create a Rhai engine whose `log(..)` and `print(..)` append to `log`.
pub fn create_engine_with_log(log: &ExecutionLog) -> Engine {
    let mut engine = create_engine();
    crate::builtins::register_log_hook(&mut engine, log.clone());
    engine
}

pub fn to_dynamic(value: &Value) -> Result<Dynamic, String> {
    rhai::serde::to_dynamic(value).map_err(|e| e.to_string())
}

pub fn from_dynamic(value: &Dynamic) -> Result<Value, String> {
    rhai::serde::from_dynamic(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_cross_the_rhai_boundary() {
        let value = json!({"n": 3, "x": 1.5, "flags": [true, false], "name": "beam", "none": null});
        let dynamic = to_dynamic(&value).unwrap();
        assert_eq!(from_dynamic(&dynamic).unwrap(), value);
    }

    #[test]
    fn test_unit_becomes_null() {
        assert_eq!(from_dynamic(&Dynamic::UNIT).unwrap(), Value::Null);
    }
}
