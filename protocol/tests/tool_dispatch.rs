//! End-to-end dispatch tests against `InMemoryStore`, exercising every
//! tool operation through its wire JSON shape rather than calling engine
//! methods directly.

use std::sync::Arc;

use arc_swap::ArcSwap;
use mocks::InMemoryStore;
use orchestrator_core::workflow_config::WorkflowConfigSnapshot;
use orchestrator_engine::Engine;
use orchestrator_protocol::ToolHandler;
use serde_json::json;

type TestHandler = ToolHandler<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore>;

fn handler() -> TestHandler {
    let store = InMemoryStore::shared();
    let config = Arc::new(ArcSwap::from_pointee(WorkflowConfigSnapshot::defaults()));
    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        config,
    );
    ToolHandler::new(engine)
}

#[tokio::test]
async fn creates_and_queries_a_project() {
    let handler = handler();

    let created = handler
        .dispatch(
            "manage_project",
            json!({
                "action": "create",
                "project": {
                    "name": "Orchestrator Rewrite",
                    "description": null,
                    "summary": null,
                    "status": "queued",
                    "tags": ["backend"],
                },
            }),
        )
        .await
        .unwrap();
    let id = created.get("id").unwrap().clone();

    let fetched = handler
        .dispatch("query_container", json!({"action": "get", "entity_type": "project", "id": id}))
        .await
        .unwrap();
    assert_eq!(fetched.get("name").unwrap(), "Orchestrator Rewrite");
}

#[tokio::test]
async fn manage_dependencies_create_then_delete_roundtrips() {
    let handler = handler();
    let make_task = |n: &str| {
        json!({
            "action": "create",
            "task": {
                "feature_id": null,
                "project_id": null,
                "title": n,
                "summary": null,
                "status": "queued",
                "priority": "MEDIUM",
                "complexity": 1,
                "tags": [],
            },
        })
    };

    let a = handler.dispatch("manage_task", make_task("A")).await.unwrap();
    let b = handler.dispatch("manage_task", make_task("B")).await.unwrap();
    let a_id = a.get("id").unwrap().clone();
    let b_id = b.get("id").unwrap().clone();

    let created = handler
        .dispatch(
            "manage_dependencies",
            json!({"action": "create", "from_task_id": a_id, "to_task_id": b_id}),
        )
        .await
        .unwrap();
    let dep_id = created.get("id").unwrap().clone();

    let deleted = handler
        .dispatch("manage_dependencies", json!({"action": "delete", "id": dep_id}))
        .await
        .unwrap();
    assert_eq!(deleted.get("deleted").unwrap(), true);
}

#[tokio::test]
async fn unknown_operation_is_rejected() {
    let handler = handler();
    let result = handler.dispatch("delete_everything", json!({})).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn get_next_task_reports_empty_catalog_as_complete() {
    let handler = handler();
    let result = handler.dispatch("get_next_task", json!({})).await.unwrap();
    assert_eq!(result.get("mode").unwrap(), "complete");
}
