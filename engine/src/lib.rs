//! Orchestration Engine: the four core services from `spec.md` §4.3–§4.6
//! (Status Progression, Dependency Engine, Recommendation Engine,
//! Completion Cascade), composed around one generic `Engine<P, F, T, S,
//! D, G, RT>` struct parametric over the repository trait implementations
//! it is built with — generalizing the teacher's
//! `McpTaskHandler<R, M, W>` dependency-injection shape
//! (`protocol/src/handler.rs`) from three repositories to seven.
//!
//! Each concern lives in its own module with its own `impl` block against
//! the shared struct, so a caller (`orchestrator-server`) constructs one
//! `Engine` and calls into whichever service a tool operation needs.

pub mod cascade;
pub mod dependency;
pub mod progression;
pub mod recommendation;

use std::sync::Arc;

use arc_swap::ArcSwap;
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, ProjectRepository, RoleTransitionRepository,
    SectionRepository, TagRepository, TaskRepository,
};
use orchestrator_core::workflow_config::WorkflowConfigSnapshot;

pub use cascade::CascadeReport;
pub use dependency::{BatchCreationError, DependencyPattern, DependencyValidationError};
pub use progression::{ApplyTransitionOutcome, Decision};
pub use recommendation::{NextTasksResult, RecommendationMode, TaskBrief};

/// Bundles every repository the engine's services need, plus a handle to
/// the hot-reloadable workflow config snapshot (owned and swapped by
/// `orchestrator-server`; the engine only ever reads it).
pub struct Engine<P, F, T, S, D, G, RT> {
    pub projects: Arc<P>,
    pub features: Arc<F>,
    pub tasks: Arc<T>,
    pub sections: Arc<S>,
    pub dependencies: Arc<D>,
    pub tags: Arc<G>,
    pub role_transitions: Arc<RT>,
    pub config: Arc<ArcSwap<WorkflowConfigSnapshot>>,
}

impl<P, F, T, S, D, G, RT> Clone for Engine<P, F, T, S, D, G, RT> {
    fn clone(&self) -> Self {
        Self {
            projects: self.projects.clone(),
            features: self.features.clone(),
            tasks: self.tasks.clone(),
            sections: self.sections.clone(),
            dependencies: self.dependencies.clone(),
            tags: self.tags.clone(),
            role_transitions: self.role_transitions.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P, F, T, S, D, G, RT> Engine<P, F, T, S, D, G, RT>
where
    P: ProjectRepository,
    F: FeatureRepository,
    T: TaskRepository,
    S: SectionRepository,
    D: DependencyRepository,
    G: TagRepository,
    RT: RoleTransitionRepository,
{
    pub fn new(
        projects: Arc<P>,
        features: Arc<F>,
        tasks: Arc<T>,
        sections: Arc<S>,
        dependencies: Arc<D>,
        tags: Arc<G>,
        role_transitions: Arc<RT>,
        config: Arc<ArcSwap<WorkflowConfigSnapshot>>,
    ) -> Self {
        Self {
            projects,
            features,
            tasks,
            sections,
            dependencies,
            tags,
            role_transitions,
            config,
        }
    }
}
