//! Standard test fixtures, generalized from the teacher's
//! one-task-per-state fixtures into the scheduling scenarios this domain
//! actually needs: a diamond dependency graph, a role-based early
//! unblock, and one task per built-in role.

use uuid::Uuid;

use orchestrator_core::models::{DependencyType, NewDependency, NewTask, Priority, StatusName, UnblockAt};
use orchestrator_core::repository::{DependencyRepository, TaskRepository};

use crate::builders::TaskBuilder;
use crate::repository::InMemoryStore;

/// A plain pending task with sensible defaults, mirroring the teacher's
/// `create_test_task`.
pub fn create_test_task() -> NewTask {
    TaskBuilder::new().with_title("Test Task").build()
}

/// One `NewTask` per built-in role's default status (the
/// pending/in-progress/in-review/completed/cancelled statuses from
/// `WorkflowConfigSnapshot::defaults`).
pub fn create_tasks_in_all_roles() -> Vec<NewTask> {
    ["pending", "in-progress", "in-review", "completed", "cancelled"]
        .into_iter()
        .enumerate()
        .map(|(i, status)| {
            TaskBuilder::new()
                .with_title(format!("{status} task"))
                .with_status(status)
                .with_priority(if i % 2 == 0 { Priority::High } else { Priority::Low })
                .build()
        })
        .collect()
}

/// The four tasks and edges of `spec.md` §8 scenario 1 ("diamond
/// unblock"): `A -> B`, `A -> C`, `B -> D`, `C -> D`, all BLOCKS with the
/// default `unblockAt = terminal`.
pub struct DiamondGraph {
    pub a: Uuid,
    pub b: Uuid,
    pub c: Uuid,
    pub d: Uuid,
}

pub async fn seed_diamond_graph(store: &InMemoryStore) -> DiamondGraph {
    let a = store.create(TaskBuilder::new().with_title("A").build()).await.unwrap().id;
    let b = store.create(TaskBuilder::new().with_title("B").build()).await.unwrap().id;
    let c = store.create(TaskBuilder::new().with_title("C").build()).await.unwrap().id;
    let d = store.create(TaskBuilder::new().with_title("D").build()).await.unwrap().id;

    for (from, to) in [(a, b), (a, c), (b, d), (c, d)] {
        store
            .create(NewDependency {
                from_task_id: from,
                to_task_id: to,
                dep_type: DependencyType::Blocks,
                unblock_at: None,
            })
            .await
            .unwrap();
    }

    DiamondGraph { a, b, c, d }
}

/// `spec.md` §8 scenario 2 ("role-based early unblock"): task `A` tagged
/// `backend`, blocking task `X` at `unblockAt = work` rather than the
/// default `terminal`.
pub struct EarlyUnblockGraph {
    pub a: Uuid,
    pub x: Uuid,
}

pub async fn seed_early_unblock_graph(store: &InMemoryStore) -> EarlyUnblockGraph {
    let a = store
        .create(TaskBuilder::new().with_title("A").with_tags(["backend"]).build())
        .await
        .unwrap()
        .id;
    let x = store.create(TaskBuilder::new().with_title("X").build()).await.unwrap().id;

    store
        .create(NewDependency {
            from_task_id: a,
            to_task_id: x,
            dep_type: DependencyType::Blocks,
            unblock_at: Some(UnblockAt::Work),
        })
        .await
        .unwrap();

    EarlyUnblockGraph { a, x }
}

/// `spec.md` §8 scenario 5 ("completion cascade with retention"): three
/// tasks under one feature, one untagged and two tagged with `bug`
/// variants of differing case, to exercise the cascade's case-insensitive
/// retain-tag match.
pub struct CascadeFixture {
    pub feature_id: Uuid,
    pub untagged: Uuid,
    pub tagged_lower: Uuid,
    pub tagged_upper: Uuid,
}

pub async fn seed_cascade_fixture(
    store: &InMemoryStore,
    features: &dyn orchestrator_core::repository::FeatureRepository,
) -> CascadeFixture {
    let feature_id = features
        .create(orchestrator_core::models::NewFeature {
            project_id: None,
            name: "Cascade Feature".to_string(),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            priority: Priority::Medium,
            tags: vec![],
        })
        .await
        .unwrap()
        .id;

    let untagged = store
        .create(TaskBuilder::new().with_title("T1").with_feature(feature_id).build())
        .await
        .unwrap()
        .id;
    let tagged_lower = store
        .create(
            TaskBuilder::new()
                .with_title("T2")
                .with_feature(feature_id)
                .with_tags(["bug"])
                .build(),
        )
        .await
        .unwrap()
        .id;
    let tagged_upper = store
        .create(
            TaskBuilder::new()
                .with_title("T3")
                .with_feature(feature_id)
                .with_tags(["BUG"])
                .build(),
        )
        .await
        .unwrap()
        .id;

    CascadeFixture {
        feature_id,
        untagged,
        tagged_lower,
        tagged_upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn diamond_graph_seeds_four_tasks_and_four_edges() {
        let store = InMemoryStore::new();
        let graph = seed_diamond_graph(&store).await;
        let inbound_d = store.find_by_to_task_id(graph.d).await.unwrap();
        assert_eq!(inbound_d.len(), 2);
    }

    #[tokio::test]
    async fn early_unblock_graph_sets_work_unblock_at() {
        let store = InMemoryStore::new();
        let graph = seed_early_unblock_graph(&store).await;
        let inbound = store.find_by_to_task_id(graph.x).await.unwrap();
        assert_eq!(inbound[0].unblock_at, Some(UnblockAt::Work));
    }
}
