//! HTTP integration tests against the real tool-server wire surface: one
//! POST `/mcp/v1/tool` endpoint dispatching `{operation, params}` to an
//! `{success, message, data, metadata}` / `{success, message, error, data:
//! null}` envelope (spec.md §6), plus `/health`. Exercises the diamond
//! unblock scenario from spec.md §8 end-to-end over the wire, not just
//! through the in-process `ToolHandler`.

use std::net::SocketAddr;
use std::time::Duration;

use orchestrator_server::config::{Config, DatabaseConfig, DomainConfig, LogFormat, LoggingConfig, ServerConfig};
use orchestrator_server::setup::initialize_app;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn start_test_server() -> (String, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    // Reserve a free port, then release it immediately before handing the
    // address to `axum::serve`'s own bind; acceptable raciness for a
    // single-process test suite.
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr: SocketAddr = reserved.local_addr().unwrap();
    drop(reserved);

    let config = Config {
        database: DatabaseConfig {
            url: Some(database_url),
            max_connections: 5,
            connection_timeout: 30,
        },
        server: ServerConfig {
            listen_addr: addr.ip().to_string(),
            port: addr.port(),
            workers: 2,
        },
        logging: LoggingConfig {
            level: "error".to_string(),
            format: LogFormat::Compact,
        },
        domain: DomainConfig {
            config_path: "/nonexistent/config.yaml".into(),
            status_workflow_path: "/nonexistent/status-workflow-config.yaml".into(),
        },
    };

    let (server, _watcher) = initialize_app(&config).await.expect("initialize app");
    let bind_addr = config.server_address();
    tokio::spawn(async move {
        server.serve(&bind_addr).await.ok();
    });

    for _ in 0..50 {
        if reqwest::get(format!("http://{addr}/health")).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    (format!("http://{addr}"), temp_dir)
}

async fn call(base_url: &str, operation: &str, params: Value) -> Value {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/mcp/v1/tool"))
        .json(&json!({ "operation": operation, "params": params }))
        .send()
        .await
        .expect("request send");
    assert!(response.status().is_success());
    response.json().await.expect("envelope json")
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (base_url, _temp_dir) = start_test_server().await;
    let response = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_operation_is_a_validation_error_envelope() {
    let (base_url, _temp_dir) = start_test_server().await;
    let envelope = call(&base_url, "nonexistent_operation", json!({})).await;
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["data"], Value::Null);
    assert!(envelope["error"]["code"].is_string());
}

#[tokio::test]
async fn project_feature_task_lifecycle_round_trips_over_http() {
    let (base_url, _temp_dir) = start_test_server().await;

    let project = call(
        &base_url,
        "manage_project",
        json!({
            "action": "create",
            "project": {
                "name": "Wire Project",
                "description": "exercised over HTTP",
                "summary": null,
                "status": "pending",
                "tags": [],
            },
        }),
    )
    .await;
    assert_eq!(project["success"], true);
    let project_id = project["data"]["id"].as_str().unwrap().to_string();

    let feature = call(
        &base_url,
        "manage_feature",
        json!({
            "action": "create",
            "feature": {
                "project_id": project_id,
                "name": "Wire Feature",
                "summary": null,
                "status": "pending",
                "priority": "MEDIUM",
                "tags": [],
            },
        }),
    )
    .await;
    assert_eq!(feature["success"], true);
    let feature_id = feature["data"]["id"].as_str().unwrap().to_string();

    let task = call(
        &base_url,
        "manage_task",
        json!({
            "action": "create",
            "task": {
                "feature_id": feature_id,
                "project_id": null,
                "title": "Wire Task",
                "summary": null,
                "status": "pending",
                "priority": "HIGH",
                "complexity": 3,
                "tags": [],
            },
        }),
    )
    .await;
    assert_eq!(task["success"], true);
    assert_eq!(task["data"]["status"], "pending");
}

#[tokio::test]
async fn diamond_unblock_scenario_over_http() {
    let (base_url, _temp_dir) = start_test_server().await;

    let project = call(
        &base_url,
        "manage_project",
        json!({
            "action": "create",
            "project": {
                "name": "Diamond",
                "description": null,
                "summary": null,
                "status": "pending",
                "tags": [],
            },
        }),
    )
    .await;
    let project_id = project["data"]["id"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for title in ["A", "B", "C", "D"] {
        let task = call(
            &base_url,
            "manage_task",
            json!({
                "action": "create",
                "task": {
                    "feature_id": null,
                    "project_id": project_id,
                    "title": title,
                    "summary": null,
                    "status": "pending",
                    "priority": "MEDIUM",
                    "complexity": 1,
                    "tags": [],
                },
            }),
        )
        .await;
        ids.push(task["data"]["id"].as_str().unwrap().to_string());
    }
    let (a, b, c, d) = (&ids[0], &ids[1], &ids[2], &ids[3]);

    let dep_result = call(
        &base_url,
        "manage_dependencies",
        json!({
            "action": "create",
            "dependencies": [
                {"from_task_id": a, "to_task_id": b, "type": "blocks"},
                {"from_task_id": a, "to_task_id": c, "type": "blocks"},
                {"from_task_id": b, "to_task_id": d, "type": "blocks"},
                {"from_task_id": c, "to_task_id": d, "type": "blocks"}
            ]
        }),
    )
    .await;
    assert_eq!(dep_result["success"], true);

    let first = call(&base_url, "get_next_task", json!({"projectId": project_id})).await;
    let first_ids: Vec<&str> = first["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(first_ids, vec![a.as_str()]);

    let completed_a = call(
        &base_url,
        "request_transition",
        json!({"entityId": a, "entityType": "task", "trigger": "complete", "newStatus": "completed"}),
    )
    .await;
    assert_eq!(completed_a["success"], true);

    let second = call(&base_url, "get_next_task", json!({"projectId": project_id})).await;
    let mut second_ids: Vec<&str> = second["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    second_ids.sort();
    let mut expected = vec![b.as_str(), c.as_str()];
    expected.sort();
    assert_eq!(second_ids, expected);
}
