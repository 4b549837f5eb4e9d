//! SQLite-backed Storage Layer for the task-orchestration backend.
//!
//! Implements every repository trait from `orchestrator_core::repository`
//! against a single embedded SQLite database (spec.md §4.2, §6), with
//! WAL mode for file-backed databases, sqlx migrations, optimistic
//! concurrency via conditional `UPDATE ... WHERE id = ? AND version = ?`,
//! and a shared search-vector/filter-query builder in [`common`].
//!
//! # Usage
//!
//! ```no_run
//! use database::SqliteStore;
//! use orchestrator_core::repository::HealthCheck;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new(":memory:").await?;
//!     store.migrate().await?;
//!     store.health_check().await?;
//!     Ok(())
//! }
//! ```

mod common;
mod sqlite;

pub use sqlite::SqliteStore;

pub use orchestrator_core::{
    error::{OrchestratorError, Result},
    models::{
        Dependency, DependencyType, EntityFilter, EntityType, Feature, NewDependency, NewFeature,
        NewProject, NewSection, NewTask, Project, RoleTransition, Section, Task, UpdateFeature,
        UpdateProject, UpdateTask,
    },
    repository::{
        DependencyRepository, FeatureRepository, HealthCheck, ProjectRepository, RepositoryStats,
        RoleTransitionRepository, SectionRepository, TagRepository, TaskRepository,
    },
};
