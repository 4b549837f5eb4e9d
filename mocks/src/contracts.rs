//! Contract test helpers for validating repository trait implementations,
//! generalized from the teacher's single `TaskRepository` contract suite
//! into one function per repository trait. Complements
//! `database/tests/contract.rs` (which covers `ProjectRepository` and
//! `TaskRepository` against `SqliteStore`) with the traits that crate
//! doesn't exercise: `FeatureRepository`, `SectionRepository`,
//! `DependencyRepository`.

use orchestrator_core::error::OrchestratorError;
use orchestrator_core::models::{
    DependencyType, EntityType, NewDependency, NewFeature, NewSection, Priority, StatusName,
    UpdateFeature,
};
use orchestrator_core::repository::{DependencyRepository, FeatureRepository, SectionRepository};

/// Any `FeatureRepository` implementation should pass create/update/
/// optimistic-concurrency/delete, mirroring `run_project_contract`.
pub async fn run_feature_contract<R: FeatureRepository>(repo: &R) {
    let created = repo
        .create(NewFeature {
            project_id: None,
            name: "Contract Feature".into(),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            priority: Priority::Medium,
            tags: vec!["contract".into()],
        })
        .await
        .unwrap();
    assert_eq!(created.version, 1);

    let updated = repo
        .update(
            created.id,
            created.version,
            UpdateFeature {
                name: Some("Renamed Feature".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed Feature");
    assert_eq!(updated.version, 2);

    let stale = repo.update(created.id, created.version, UpdateFeature::default()).await;
    assert!(matches!(stale, Err(OrchestratorError::Conflict(_))));

    let deleted = repo.delete(created.id).await.unwrap();
    assert!(deleted);
    assert!(repo.get_by_id(created.id).await.unwrap().is_none());
}

/// Any `SectionRepository` implementation should preserve ordinal
/// ordering and reject duplicate ordinals within the same entity.
pub async fn run_section_contract<R: SectionRepository>(repo: &R, entity_id: uuid::Uuid) {
    let first = repo
        .create(NewSection {
            entity_type: EntityType::Task,
            entity_id,
            title: "First".into(),
            usage_description: None,
            content: "content one".into(),
            content_format: "markdown".into(),
            ordinal: 0,
            tags: vec![],
        })
        .await
        .unwrap();

    let second = repo
        .create(NewSection {
            entity_type: EntityType::Task,
            entity_id,
            title: "Second".into(),
            usage_description: None,
            content: "content two".into(),
            content_format: "markdown".into(),
            ordinal: 1,
            tags: vec![],
        })
        .await
        .unwrap();

    let listed = repo.list_for_entity(EntityType::Task, entity_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].id, second.id);

    let deleted = repo.delete_for_entity(EntityType::Task, entity_id).await.unwrap();
    assert_eq!(deleted, 2);
}

/// Any `DependencyRepository` implementation should reject edges that
/// would close a cycle and support lookups by either endpoint.
pub async fn run_dependency_contract<R: DependencyRepository>(repo: &R, a: uuid::Uuid, b: uuid::Uuid, c: uuid::Uuid) {
    repo.create(NewDependency {
        from_task_id: a,
        to_task_id: b,
        dep_type: DependencyType::Blocks,
        unblock_at: None,
    })
    .await
    .unwrap();
    repo.create(NewDependency {
        from_task_id: b,
        to_task_id: c,
        dep_type: DependencyType::Blocks,
        unblock_at: None,
    })
    .await
    .unwrap();

    assert!(repo.has_cyclic_dependency(c, a).await.unwrap());
    assert!(!repo.has_cyclic_dependency(a, c).await.unwrap());

    let from_b = repo.find_by_from_task_id(b).await.unwrap();
    assert_eq!(from_b.len(), 1);
    let to_c = repo.find_by_to_task_id(c).await.unwrap();
    assert_eq!(to_c.len(), 1);

    let deleted = repo.delete_all_for_task(b).await.unwrap();
    assert_eq!(deleted, 2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use orchestrator_core::repository::TaskRepository;

    #[tokio::test]
    async fn feature_contract_passes_against_in_memory_store() {
        let store = InMemoryStore::new();
        run_feature_contract(&store).await;
    }

    #[tokio::test]
    async fn section_contract_passes_against_in_memory_store() {
        let store = InMemoryStore::new();
        let task = store
            .create(crate::builders::TaskBuilder::new().with_title("Owner").build())
            .await
            .unwrap();
        run_section_contract(&store, task.id).await;
    }

    #[tokio::test]
    async fn dependency_contract_passes_against_in_memory_store() {
        let store = InMemoryStore::new();
        let a = store.create(crate::builders::TaskBuilder::new().with_title("A").build()).await.unwrap().id;
        let b = store.create(crate::builders::TaskBuilder::new().with_title("B").build()).await.unwrap().id;
        let c = store.create(crate::builders::TaskBuilder::new().with_title("C").build()).await.unwrap().id;
        run_dependency_contract(&store, a, b, c).await;
    }
}
