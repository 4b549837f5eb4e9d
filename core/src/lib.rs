//! Orchestration Core Library
//!
//! Foundational domain models, storage-trait interfaces, workflow-config
//! types, and validation utilities for the task-orchestration backend.
//! Every other crate in this workspace depends on the types defined here.
//!
//! # Architecture
//!
//! - [`models`] - domain entities (Project, Feature, Task, Section, Dependency, RoleTransition, ...)
//! - [`error`] - error types and result handling
//! - [`repository`] - Storage Layer trait contracts
//! - [`workflow_config`] - the declarative status/role document and its atomic snapshot
//! - [`validation`] - business-rule validation shared by the core services
//!
//! # Example
//!
//! ```rust
//! use orchestrator_core::{
//!     models::{NewTask, Priority, StatusName},
//!     validation::Validator,
//! };
//!
//! let new_task = NewTask {
//!     feature_id: None,
//!     project_id: None,
//!     title: "Design the scheduler".to_string(),
//!     summary: None,
//!     status: StatusName::new("pending").unwrap(),
//!     priority: Priority::High,
//!     complexity: 5,
//!     tags: vec![],
//! };
//!
//! Validator::validate_new_task(&new_task).unwrap();
//! ```

pub mod error;
pub mod models;
pub mod repository;
pub mod validation;
pub mod workflow_config;

pub use error::{OrchestratorError, Result};
pub use models::{
    Dependency, DependencyType, EntityFilter, EntityType, Feature, NewDependency, NewFeature,
    NewProject, NewSection, NewTask, Priority, Project, Role, RoleTransition, Scope, Section,
    StatusName, Task, Trigger, UnblockAt, UpdateFeature, UpdateProject, UpdateTask,
};
pub use repository::{
    DependencyRepository, FeatureRepository, HealthCheck, ProjectRepository, RepositoryStats,
    RoleTransitionRepository, SectionRepository, TagRepository, TaskRepository,
};
pub use validation::Validator;
pub use workflow_config::{WorkflowConfigDocument, WorkflowConfigSnapshot};

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "orchestrator-core");
    }

    #[test]
    fn test_re_exports() {
        let status = StatusName::new("pending").unwrap();
        assert_eq!(format!("{status}"), "pending");

        let error = OrchestratorError::not_found("Task", "missing");
        assert!(error.is_not_found());
    }
}
