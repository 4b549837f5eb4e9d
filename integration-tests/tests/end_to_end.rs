//! The six concrete end-to-end scenarios against the real
//! `orchestrator-server` binary over HTTP, each spinning up its own
//! tempfile-backed SQLite database and a fresh server process.

use integration_tests::{feature_payload, project_payload, task_payload, test_tempdir, ServerHarness};
use serde_json::json;

async fn create_project(server: &ServerHarness, name: &str) -> String {
    let result = server
        .call("manage_project", json!({"action": "create", "project": project_payload(name)}))
        .await;
    assert_eq!(result["success"], true, "{result:?}");
    result["data"]["id"].as_str().unwrap().to_string()
}

async fn create_task(
    server: &ServerHarness,
    title: &str,
    project_id: Option<&str>,
    feature_id: Option<&str>,
    priority: &str,
    complexity: u8,
    tags: &[&str],
) -> String {
    let result = server
        .call(
            "manage_task",
            json!({"action": "create", "task": task_payload(title, project_id, feature_id, priority, complexity, tags)}),
        )
        .await;
    assert_eq!(result["success"], true, "{result:?}");
    result["data"]["id"].as_str().unwrap().to_string()
}

async fn create_dependency(server: &ServerHarness, from: &str, to: &str) {
    let result = server
        .call(
            "manage_dependencies",
            json!({"action": "create", "from_task_id": from, "to_task_id": to, "type": "blocks"}),
        )
        .await;
    assert_eq!(result["success"], true, "{result:?}");
}

fn task_ids(envelope: &serde_json::Value) -> Vec<String> {
    envelope["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn scenario_1_diamond_unblock() {
    let tempdir = test_tempdir();
    let server = ServerHarness::spawn(tempdir.path()).await.expect("server spawn");

    let project_id = create_project(&server, "Diamond").await;
    let a = create_task(&server, "A", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    let b = create_task(&server, "B", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    let c = create_task(&server, "C", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    let d = create_task(&server, "D", Some(&project_id), None, "MEDIUM", 1, &[]).await;

    create_dependency(&server, &a, &b).await;
    create_dependency(&server, &a, &c).await;
    create_dependency(&server, &b, &d).await;
    create_dependency(&server, &c, &d).await;

    let first = server.call("get_next_task", json!({"projectId": project_id})).await;
    assert_eq!(task_ids(&first), vec![a.clone()]);

    let transitioned = server
        .call(
            "request_transition",
            json!({"entityId": a, "entityType": "task", "trigger": "complete", "newStatus": "completed"}),
        )
        .await;
    assert_eq!(transitioned["success"], true, "{transitioned:?}");

    let second = server.call("get_next_task", json!({"projectId": project_id})).await;
    let mut second_ids = task_ids(&second);
    second_ids.sort();
    let mut expected = vec![b.clone(), c.clone()];
    expected.sort();
    assert_eq!(second_ids, expected);

    server
        .call(
            "request_transition",
            json!({"entityId": b, "entityType": "task", "trigger": "complete", "newStatus": "completed"}),
        )
        .await;
    server
        .call(
            "request_transition",
            json!({"entityId": c, "entityType": "task", "trigger": "complete", "newStatus": "completed"}),
        )
        .await;

    let third = server.call("get_next_task", json!({"projectId": project_id})).await;
    assert_eq!(task_ids(&third), vec![d]);

    server.shutdown().await;
}

#[tokio::test]
async fn scenario_2_role_based_early_unblock() {
    let tempdir = test_tempdir();
    let server = ServerHarness::spawn(tempdir.path()).await.expect("server spawn");

    let project_id = create_project(&server, "Early Unblock").await;
    let a = create_task(&server, "A", Some(&project_id), None, "MEDIUM", 1, &["backend"]).await;
    let x = create_task(&server, "X", Some(&project_id), None, "MEDIUM", 1, &[]).await;

    let created = server
        .call(
            "manage_dependencies",
            json!({"action": "create", "from_task_id": a, "to_task_id": x, "type": "blocks", "unblock_at": "work"}),
        )
        .await;
    assert_eq!(created["success"], true, "{created:?}");

    let pending = server.call("get_next_task", json!({"projectId": project_id})).await;
    assert!(!task_ids(&pending).contains(&x));

    let started = server
        .call(
            "request_transition",
            json!({"entityId": a, "entityType": "task", "trigger": "start", "newStatus": "in-progress"}),
        )
        .await;
    assert_eq!(started["success"], true, "{started:?}");

    let after_start = server.call("get_next_task", json!({"projectId": project_id})).await;
    assert!(task_ids(&after_start).contains(&x));

    server.shutdown().await;
}

#[tokio::test]
async fn scenario_3_cycle_rejection_in_batch() {
    let tempdir = test_tempdir();
    let server = ServerHarness::spawn(tempdir.path()).await.expect("server spawn");

    let project_id = create_project(&server, "Cycle").await;
    let t1 = create_task(&server, "T1", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    let t2 = create_task(&server, "T2", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    let t3 = create_task(&server, "T3", Some(&project_id), None, "MEDIUM", 1, &[]).await;

    let linear = server
        .call(
            "manage_dependencies",
            json!({"action": "create", "pattern": "linear", "task_ids": [t1, t2, t3]}),
        )
        .await;
    assert_eq!(linear["success"], true, "{linear:?}");

    let cyclic = server
        .call(
            "manage_dependencies",
            json!({"action": "create", "from_task_id": t3, "to_task_id": t1, "type": "blocks"}),
        )
        .await;
    assert_eq!(cyclic["success"], false);
    assert!(cyclic["error"]["code"].is_string());

    server.shutdown().await;
}

#[tokio::test]
async fn scenario_4_optimistic_lock_conflict() {
    let tempdir = test_tempdir();
    let server = ServerHarness::spawn(tempdir.path()).await.expect("server spawn");

    let project_id = create_project(&server, "Conflict").await;
    let task_id = create_task(&server, "Original", Some(&project_id), None, "MEDIUM", 1, &[]).await;

    let fetched = server
        .call("query_container", json!({"action": "get", "entity_type": "task", "id": task_id}))
        .await;
    let version = fetched["data"]["version"].as_i64().unwrap();

    let first_update = server
        .call(
            "manage_task",
            json!({"action": "update", "id": task_id, "version": version, "update": {"title": "First writer"}}),
        )
        .await;
    assert_eq!(first_update["success"], true, "{first_update:?}");

    let second_update = server
        .call(
            "manage_task",
            json!({"action": "update", "id": task_id, "version": version, "update": {"title": "Second writer"}}),
        )
        .await;
    assert_eq!(second_update["success"], false);

    let refetched = server
        .call("query_container", json!({"action": "get", "entity_type": "task", "id": task_id}))
        .await;
    assert_eq!(refetched["data"]["title"], "First writer");

    server.shutdown().await;
}

#[tokio::test]
async fn scenario_5_completion_cascade_with_retention() {
    let tempdir = test_tempdir();
    let config_yaml = r#"
completion_cleanup:
  enabled: true
  retain_tags: ["bug"]
"#;
    let server = ServerHarness::spawn_with_config(tempdir.path(), Some(config_yaml))
        .await
        .expect("server spawn");

    let project_id = create_project(&server, "Cascade").await;
    let feature = server
        .call("manage_feature", json!({"action": "create", "feature": feature_payload(&project_id, "Cascade Feature")}))
        .await;
    assert_eq!(feature["success"], true, "{feature:?}");
    let feature_id = feature["data"]["id"].as_str().unwrap().to_string();

    let t1 = create_task(&server, "T1", None, Some(&feature_id), "MEDIUM", 1, &[]).await;
    let t2 = create_task(&server, "T2", None, Some(&feature_id), "MEDIUM", 1, &["bug"]).await;
    let t3 = create_task(&server, "T3", None, Some(&feature_id), "MEDIUM", 1, &["BUG"]).await;

    let transitioned = server
        .call(
            "request_transition",
            json!({"entityId": feature_id, "entityType": "feature", "trigger": "complete", "newStatus": "completed"}),
        )
        .await;
    assert_eq!(transitioned["success"], true, "{transitioned:?}");

    let cascade = &transitioned["data"]["cascade"];
    assert_eq!(cascade["performed"], true);
    assert_eq!(cascade["tasksDeleted"].as_i64().or(cascade["tasks_deleted"].as_i64()), Some(1));
    assert_eq!(cascade["tasksRetained"].as_i64().or(cascade["tasks_retained"].as_i64()), Some(2));

    let t1_lookup = server.call("query_container", json!({"action": "get", "entity_type": "task", "id": t1})).await;
    assert_eq!(t1_lookup["success"], false);

    let t2_lookup = server.call("query_container", json!({"action": "get", "entity_type": "task", "id": t2})).await;
    assert_eq!(t2_lookup["success"], true);
    let t3_lookup = server.call("query_container", json!({"action": "get", "entity_type": "task", "id": t3})).await;
    assert_eq!(t3_lookup["success"], true);

    server.shutdown().await;
}

#[tokio::test]
async fn scenario_6_search_and_semantics() {
    let tempdir = test_tempdir();
    let server = ServerHarness::spawn(tempdir.path()).await.expect("server spawn");

    let project_id = create_project(&server, "Search").await;
    create_task(&server, "alpha beta", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    create_task(&server, "alpha", Some(&project_id), None, "MEDIUM", 1, &[]).await;
    create_task(&server, "beta gamma", Some(&project_id), None, "MEDIUM", 1, &[]).await;

    let found = server
        .call(
            "query_container",
            json!({"action": "search", "entity_type": "task", "query": "alpha beta"}),
        )
        .await;
    assert_eq!(found["success"], true, "{found:?}");
    let titles: Vec<String> = found["data"]
        .as_array()
        .expect("search results array")
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["alpha beta".to_string()]);

    server.shutdown().await;
}
