//! Harness for driving the real `orchestrator-server` binary over HTTP,
//! used by the end-to-end scenarios in `tests/`. Grounded in the teacher's
//! `integration-tests` crate, which spawned its server binary with
//! `assert_cmd`/`tokio::process::Command` and drove it over the wire rather
//! than calling handler code in-process.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::time::sleep;

pub struct ServerHarness {
    child: Child,
    pub base_url: String,
}

impl ServerHarness {
    pub async fn spawn(db_dir: &std::path::Path) -> Result<Self> {
        Self::spawn_with_config(db_dir, None).await
    }

    /// `config_yaml`, if given, is written to `db_dir/config.yaml` and
    /// passed as `--config-yaml` (e.g. to enable the completion cascade
    /// with custom `retain_tags` for scenario 5).
    pub async fn spawn_with_config(db_dir: &std::path::Path, config_yaml: Option<&str>) -> Result<Self> {
        let binary = assert_cmd::cargo::cargo_bin("orchestrator-server");
        let db_path = db_dir.join(format!("{}.sqlite", uuid::Uuid::new_v4()));
        let database_url = format!("sqlite://{}", db_path.display());

        let reserved = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr: SocketAddr = reserved.local_addr()?;
        drop(reserved);

        let mut command = Command::new(&binary);
        command
            .arg("--start")
            .arg("--port")
            .arg(addr.port().to_string())
            .arg("--database-url")
            .arg(&database_url)
            .arg("--log-level")
            .arg("error")
            .kill_on_drop(true);

        if let Some(yaml) = config_yaml {
            let config_path = db_dir.join("config.yaml");
            std::fs::write(&config_path, yaml).context("writing config.yaml")?;
            command.arg("--config-yaml").arg(&config_path);
        }

        let mut child = command.spawn().with_context(|| format!("spawning {binary:?}"))?;

        let base_url = format!("http://{addr}");
        let mut ready = false;
        for _ in 0..100 {
            if let Ok(Some(status)) = child.try_wait() {
                anyhow::bail!("orchestrator-server exited early with {status}");
            }
            if reqwest::get(format!("{base_url}/health")).await.is_ok() {
                ready = true;
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
        anyhow::ensure!(ready, "server did not become healthy in time");

        Ok(Self { child, base_url })
    }

    pub async fn call(&self, operation: &str, params: Value) -> Value {
        reqwest::Client::new()
            .post(format!("{}/mcp/v1/tool", self.base_url))
            .json(&json!({ "operation": operation, "params": params }))
            .send()
            .await
            .expect("request send")
            .json()
            .await
            .expect("envelope json")
    }

    pub async fn shutdown(mut self) {
        let _ = self.child.kill().await;
    }
}

pub fn project_payload(name: &str) -> Value {
    json!({
        "name": name,
        "description": null,
        "summary": null,
        "status": "pending",
        "tags": [],
    })
}

pub fn task_payload(title: &str, project_id: Option<&str>, feature_id: Option<&str>, priority: &str, complexity: u8, tags: &[&str]) -> Value {
    json!({
        "feature_id": feature_id,
        "project_id": project_id,
        "title": title,
        "summary": null,
        "status": "pending",
        "priority": priority,
        "complexity": complexity,
        "tags": tags,
    })
}

pub fn feature_payload(project_id: &str, name: &str) -> Value {
    json!({
        "project_id": project_id,
        "name": name,
        "summary": null,
        "status": "pending",
        "priority": "MEDIUM",
        "tags": [],
    })
}

pub fn test_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}
