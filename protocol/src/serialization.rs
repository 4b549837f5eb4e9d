//! Serialization utilities for the tool surface
//!
//! Every domain type already derives `Serialize`/`Deserialize`
//! (`orchestrator_core::models`), so this module is a thin seam rather
//! than the teacher's per-field JSON builder: generic helpers for
//! turning any serializable result into the envelope's `data` field and
//! any JSON params blob into a typed request struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// Serialize any domain value into the envelope's `data` field.
pub fn to_data_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::MalformedRequest(e.to_string()))
}

/// Deserialize a tool operation's JSON params into its typed request
/// struct.
pub fn deserialize_params<T>(params: Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(params).map_err(|e| ToolError::MalformedRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::Priority;
    use serde_json::json;

    #[test]
    fn round_trips_a_simple_value() {
        let value = to_data_value(&Priority::High).unwrap();
        let back: Priority = deserialize_params(value).unwrap();
        assert_eq!(back, Priority::High);
    }

    #[test]
    fn reports_malformed_params_as_tool_error() {
        let result: Result<Priority, _> = deserialize_params(json!("not-a-priority"));
        assert!(result.is_err());
    }
}
