use thiserror::Error;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Error kinds for the orchestration core.
///
/// Every variant maps to one of the four wire error codes named in the
/// external interface contract (`VALIDATION_ERROR`, `RESOURCE_NOT_FOUND`,
/// `CONFLICT`, `DATABASE_ERROR`), plus a fifth for workflow-config load
/// failures which never cross the wire as a tool response.
///
/// # Examples
///
/// ```rust
/// use orchestrator_core::error::OrchestratorError;
///
/// let not_found = OrchestratorError::not_found("Task", "missing-id");
/// assert!(not_found.is_not_found());
/// assert_eq!(not_found.code(), "RESOURCE_NOT_FOUND");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Malformed input or invariant violation caught before any write.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Optimistic-lock mismatch or other structural conflict (would create
    /// a cycle, duplicate ordinal, duplicate dependency triple, etc.).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure surfaced by the storage layer.
    #[error("Database error: {0}")]
    Database(String),

    /// Workflow config document failed to load or parse.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catch-all for conditions that should be unreachable.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("Field '{field}' cannot be empty"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// The wire error code from the external interface contract.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::Internal(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = OrchestratorError::not_found("Task", "42");
        assert!(error.is_not_found());
        assert_eq!(error.code(), "RESOURCE_NOT_FOUND");

        let error = OrchestratorError::validation("bad code");
        assert!(error.is_validation());
        assert_eq!(error.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_error_display() {
        let error = OrchestratorError::not_found("Task", "missing-id");
        assert_eq!(format!("{error}"), "Task not found: missing-id");

        let error = OrchestratorError::conflict("version mismatch");
        assert_eq!(format!("{error}"), "Conflict: version mismatch");
    }

    #[test]
    fn test_error_predicates() {
        assert!(OrchestratorError::not_found("Task", "1").is_not_found());
        assert!(!OrchestratorError::validation("x").is_not_found());
        assert!(OrchestratorError::validation("x").is_validation());
        assert!(!OrchestratorError::Database("x".into()).is_validation());
        assert!(OrchestratorError::Database("x".into()).is_database());
    }
}
