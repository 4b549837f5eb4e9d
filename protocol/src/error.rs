//! Error handling for the tool surface
//!
//! Maps `orchestrator_core::error::OrchestratorError` to the envelope's
//! `{code, details}` error shape, generalized from the teacher's
//! `McpError`/JSON-RPC error-code mapping.

use orchestrator_core::error::OrchestratorError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors surfaced by the tool dispatcher itself, distinct from domain
/// errors raised by `orchestrator-engine`/`orchestrator-core`.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Domain(#[from] OrchestratorError),
}

impl ToolError {
    /// Wire error code, matching `orchestrator_core::error::OrchestratorError::code`
    /// for domain errors and adding two dispatcher-only codes.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            ToolError::MalformedRequest(_) => "VALIDATION_ERROR",
            ToolError::Domain(err) => err.code(),
        }
    }

    /// Render as the envelope's error body: `{code, details}`.
    pub fn to_envelope_error(&self) -> Value {
        json!({
            "code": self.code(),
            "details": self.to_string(),
        })
    }
}

/// The envelope's top-level shape, serialized directly for both success
/// and failure responses (spec.md §6).
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    // Always serialized, even as `null` on failure: spec.md §6 fixes the
    // error envelope shape as `{..., error:{code,details}, data:null}`.
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value, metadata: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
            metadata,
        }
    }

    pub fn failure(err: &ToolError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            data: None,
            error: Some(err.to_envelope_error()),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_code_passes_through() {
        let err = ToolError::Domain(OrchestratorError::not_found("Task", "1"));
        assert_eq!(err.code(), "RESOURCE_NOT_FOUND");
    }

    #[test]
    fn unknown_operation_has_its_own_code() {
        let err = ToolError::UnknownOperation("delete_everything".into());
        assert_eq!(err.code(), "UNKNOWN_OPERATION");
    }

    #[test]
    fn failure_envelope_has_a_null_data_field() {
        let err = ToolError::MalformedRequest("missing title".into());
        let envelope = Envelope::failure(&err);
        assert!(!envelope.success);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value.get("data"), Some(&Value::Null));
    }
}
