//! stdio transport
//!
//! Line-based alternative to the HTTP transport in `orchestrator-protocol`:
//! each line on stdin is one `{id, operation, params}` request, each line
//! written to stdout is the corresponding `{id, ...envelope}` response.
//! Keeps the teacher's read-line/dispatch/write-line loop shape; the
//! JSON-RPC 2.0 handshake and its teacher-specific parameter types are
//! gone since this domain's wire format is the envelope from `spec.md` §6,
//! not JSON-RPC.

use anyhow::{Context, Result};
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, ProjectRepository, RoleTransitionRepository, SectionRepository,
    TagRepository, TaskRepository,
};
use orchestrator_protocol::{Envelope, ToolError, ToolHandler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct StdioRequest {
    #[serde(default)]
    id: Option<Value>,
    operation: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct StdioResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    envelope: Envelope,
}

/// Run the stdio request/response loop until stdin is closed.
pub async fn serve_stdio<P, F, T, S, D, G, RT>(handler: Arc<ToolHandler<P, F, T, S, D, G, RT>>) -> Result<()>
where
    P: ProjectRepository + Send + Sync + 'static,
    F: FeatureRepository + Send + Sync + 'static,
    T: TaskRepository + Send + Sync + 'static,
    S: SectionRepository + Send + Sync + 'static,
    D: DependencyRepository + Send + Sync + 'static,
    G: TagRepository + Send + Sync + 'static,
    RT: RoleTransitionRepository + Send + Sync + 'static,
{
    info!("stdio transport ready, reading requests from stdin");

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("stdin closed, shutting down stdio transport");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!("received line: {}", trimmed);

                let response = handle_line(&handler, trimmed).await;
                write_response(&mut stdout, &response).await?;
            }
            Err(e) => {
                error!(error = %e, "failed to read line from stdin");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_line<P, F, T, S, D, G, RT>(
    handler: &ToolHandler<P, F, T, S, D, G, RT>,
    line: &str,
) -> StdioResponse
where
    P: ProjectRepository + Send + Sync + 'static,
    F: FeatureRepository + Send + Sync + 'static,
    T: TaskRepository + Send + Sync + 'static,
    S: SectionRepository + Send + Sync + 'static,
    D: DependencyRepository + Send + Sync + 'static,
    G: TagRepository + Send + Sync + 'static,
    RT: RoleTransitionRepository + Send + Sync + 'static,
{
    let request: StdioRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            let err = ToolError::MalformedRequest(format!("invalid JSON request: {e}"));
            return StdioResponse {
                id: None,
                envelope: Envelope::failure(&err),
            };
        }
    };

    let envelope = match handler.dispatch(&request.operation, request.params).await {
        Ok(data) => Envelope::success("ok", data, None),
        Err(err) => Envelope::failure(&err),
    };

    StdioResponse {
        id: request.id,
        envelope,
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &StdioResponse,
) -> Result<()> {
    let response_json = serde_json::to_string(response).context("failed to serialize response")?;
    stdout
        .write_all(response_json.as_bytes())
        .await
        .context("failed to write response to stdout")?;
    stdout.write_all(b"\n").await.context("failed to write newline to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    debug!("sent response: {}", response_json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_swap::ArcSwap;
    use mocks::InMemoryStore;
    use orchestrator_core::workflow_config::WorkflowConfigSnapshot;
    use orchestrator_engine::Engine;
    use serde_json::json;

    fn handler() -> ToolHandler<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore> {
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
    async fn unknown_operation_yields_failure_envelope_with_id_preserved() {
        let h = handler();
        let line = json!({"id": 7, "operation": "nonsense", "params": {}}).to_string();
        let response = handle_line(&h, &line).await;
        assert_eq!(response.id, Some(json!(7)));
        assert!(!response.envelope.success);
    }

    #[tokio::test]
    async fn malformed_json_line_yields_failure_envelope_without_id() {
        let h = handler();
        let response = handle_line(&h, "not json").await;
        assert!(response.id.is_none());
        assert!(!response.envelope.success);
    }
}
