//! Storage Layer contracts (`spec.md` §4.2): one async trait per
//! versioned entity plus the shared tag, dependency, and role-transition
//! repositories. `database::*` provides the sqlx/SQLite implementations;
//! `mocks::*` provides in-memory ones for tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Dependency, EntityFilter, EntityType, Feature, NewDependency, NewFeature, NewProject,
    NewSection, NewTask, Project, RoleTransition, Section, Task, UpdateFeature, UpdateProject,
    UpdateTask,
};

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: NewProject) -> Result<Project>;
    /// Conditional `UPDATE ... WHERE id = ? AND version = ?`; zero rows
    /// affected disambiguates `NotFound` from `Conflict` by re-checking
    /// existence.
    async fn update(&self, id: Uuid, version: i32, updates: UpdateProject) -> Result<Project>;
    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Project>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Project>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Project>>;
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Project>>;
}

#[async_trait]
pub trait FeatureRepository: Send + Sync {
    async fn create(&self, feature: NewFeature) -> Result<Feature>;
    async fn update(&self, id: Uuid, version: i32, updates: UpdateFeature) -> Result<Feature>;
    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Feature>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Feature>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Feature>>;
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Feature>>;
    async fn list_children(&self, project_id: Uuid) -> Result<Vec<Feature>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: NewTask) -> Result<Task>;
    async fn update(&self, id: Uuid, version: i32, updates: UpdateTask) -> Result<Task>;
    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Task>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Task>>;
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Task>>;
    async fn list_children(&self, feature_id: Uuid) -> Result<Vec<Task>>;
    /// All tasks whose status falls in the `queue` role within `scope`,
    /// the Recommendation Engine's raw candidate set before blocking
    /// resolution is applied.
    async fn list_candidates(
        &self,
        project_id: Option<Uuid>,
        feature_id: Option<Uuid>,
        queue_statuses: &[String],
    ) -> Result<Vec<Task>>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn create(&self, section: NewSection) -> Result<Section>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Section>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<Vec<Section>>;
    async fn delete_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<u64>;
    /// Two-phase reorder (temporary negative ordinals, then the final
    /// permutation) to avoid the unique-ordinal constraint colliding
    /// with itself mid-update, per invariant 2.
    async fn reorder(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<Section>>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn set_tags(&self, entity_type: EntityType, entity_id: Uuid, tags: Vec<String>) -> Result<()>;
    async fn find_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<Vec<Uuid>>;
    async fn find_by_tags(
        &self,
        entity_type: EntityType,
        tags: &[String],
        match_all: bool,
    ) -> Result<Vec<Uuid>>;
    async fn all_tags(&self, entity_type: EntityType) -> Result<Vec<String>>;
    async fn count_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<u64>;
}

#[async_trait]
pub trait DependencyRepository: Send + Sync {
    async fn create(&self, dep: NewDependency) -> Result<Dependency>;
    async fn create_batch(&self, deps: Vec<NewDependency>) -> Result<Vec<Dependency>>;
    /// DFS from `to` over outgoing BLOCKS edges; true if `from` is
    /// reachable (i.e. inserting `from -> to` would close a cycle).
    async fn has_cyclic_dependency(&self, from: Uuid, to: Uuid) -> Result<bool>;
    async fn find_by_to_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>>;
    async fn find_by_from_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>>;
    async fn find_by_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn delete_by_tasks(
        &self,
        from_task_id: Uuid,
        to_task_id: Uuid,
        dep_type: Option<crate::models::DependencyType>,
    ) -> Result<u64>;
    async fn delete_all_for_task(&self, task_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait RoleTransitionRepository: Send + Sync {
    async fn create(&self, event: RoleTransition) -> Result<RoleTransition>;
    async fn find_by_entity_id(&self, entity_id: Uuid) -> Result<Vec<RoleTransition>>;
}

/// Aggregate health/statistics contract, mirroring the teacher's
/// `RepositoryStats`/`health_check` shape, generalized across entities.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RepositoryStats {
    pub total_projects: u64,
    pub total_features: u64,
    pub total_tasks: u64,
    pub total_dependencies: u64,
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<()>;
    async fn get_stats(&self) -> Result<RepositoryStats>;
}
