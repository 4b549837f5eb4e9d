//! Integration tests for the mocks crate
//!
//! Tests the mock implementations and utilities to ensure they work
//! correctly and provide the expected testing capabilities.

use mocks::*;
use orchestrator_core::error::OrchestratorError;
use orchestrator_core::repository::{DependencyRepository, HealthCheck, TaskRepository};

#[tokio::test]
async fn test_in_memory_store_basic_operations() {
    let store = InMemoryStore::new();

    let task = store.create(create_new_task()).await.unwrap();
    assert_eq!(task.version, 1);
    assert_eq!(task.status.as_str(), "pending");

    store.assert_called("task.create");

    let retrieved = store.get_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(retrieved.id, task.id);

    store.assert_called("task.get_by_id");
}

#[tokio::test]
async fn test_in_memory_store_error_injection() {
    let store = InMemoryStore::new();

    store.inject_error(OrchestratorError::not_found("task", uuid::Uuid::nil().to_string()));

    let result = store.get_by_id(uuid::Uuid::new_v4()).await;
    assert!(result.is_err());
    assert!(result.unwrap_err().is_not_found());

    store.clear_error();
    let result = store.get_by_id(uuid::Uuid::new_v4()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_in_memory_store_status_transitions() {
    let store = InMemoryStore::new();

    let task = store.create(create_new_task()).await.unwrap();

    let updated = store.set_status(task.id, task.version, "in-progress").await.unwrap();
    assert_eq!(updated.status.as_str(), "in-progress");
    assert_eq!(updated.version, 2);

    let stale = store.set_status(task.id, task.version, "in-progress").await;
    assert!(stale.is_err());
    assert!(stale.unwrap_err().is_conflict());
}

#[tokio::test]
async fn test_fixtures_create_tasks_in_all_roles() {
    let tasks = create_tasks_in_all_roles();
    assert_eq!(tasks.len(), 5);

    let statuses: Vec<_> = tasks.iter().map(|t| t.status.as_str().to_string()).collect();
    for expected in ["pending", "in-progress", "in-review", "completed", "cancelled"] {
        assert!(statuses.contains(&expected.to_string()));
    }
}

#[tokio::test]
async fn test_fixtures_diamond_graph_unblocks_only_after_both_parents_terminal() {
    let store = InMemoryStore::new();
    let graph = seed_diamond_graph(&store).await;

    let inbound = store.find_by_to_task_id(graph.d).await.unwrap();
    assert_eq!(inbound.len(), 2);
    assert!(inbound.iter().all(|d| d.unblock_at.is_none()));
}

#[tokio::test]
async fn test_builders_task_builder() {
    let task = TaskBuilder::new()
        .with_title("Built Task")
        .with_status("in-progress")
        .with_complexity(7)
        .with_tags(["backend"])
        .build();

    assert_eq!(task.title, "Built Task");
    assert_eq!(task.status.as_str(), "in-progress");
    assert_eq!(task.complexity, 7);
    assert_eq!(task.tags, vec!["backend".to_string()]);
}

#[tokio::test]
async fn test_assertions_task_equals() {
    let store = InMemoryStore::new();
    let task1 = store.create(create_test_task()).await.unwrap();
    let task2 = task1.clone();

    assert_task_equals(&task1, &task2);

    let mut task3 = task1.clone();
    task3.title = "Different".to_string();

    let result = std::panic::catch_unwind(|| assert_task_equals(&task1, &task3));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_generators_realistic_data() {
    let task = generate_random_new_task();

    assert!(!task.title.is_empty());
    assert!((1..=10).contains(&task.complexity));
    assert!(!task.tags.is_empty());
}

#[tokio::test]
async fn test_in_memory_store_concurrent_access() {
    use std::sync::Arc;
    use tokio::task::JoinSet;

    let store = InMemoryStore::shared();
    let mut set = JoinSet::new();

    for i in 0..10 {
        let store_clone: Arc<InMemoryStore> = store.clone();
        set.spawn(async move {
            let new_task = TaskBuilder::new().with_title(format!("Concurrent Task {i}")).build();
            store_clone.create(new_task).await.unwrap()
        });
    }

    let mut tasks = Vec::new();
    while let Some(result) = set.join_next().await {
        tasks.push(result.unwrap());
    }

    assert_eq!(tasks.len(), 10);

    let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_in_memory_store_stats() {
    let store = InMemoryStore::new();
    for task in create_tasks_in_all_roles() {
        store.create(task).await.unwrap();
    }

    let stats = HealthCheck::get_stats(&store).await.unwrap();
    assert_eq!(stats.total_tasks, 5);
}

#[tokio::test]
async fn test_contract_tests_against_in_memory_store() {
    let store = InMemoryStore::new();

    contracts::run_feature_contract(&store).await;

    let history = store.call_history();
    assert!(!history.is_empty(), "store should record method calls");
    assert!(history.iter().any(|call| call.contains("feature.create")));
}
