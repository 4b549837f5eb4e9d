//! Tool server with an HTTP transport
//!
//! Generalizes the teacher's axum `McpServer<R>` (SSE + JSON-RPC routes
//! over one repository) to one POST endpoint dispatching the seven tool
//! operations over `ToolHandler`'s generic repository set, plus the same
//! `/health` route.

use std::sync::Arc;

use axum::{extract::State, middleware, routing::post, Json, Router};
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, ProjectRepository, RoleTransitionRepository, SectionRepository,
    TagRepository, TaskRepository,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::Envelope;
use crate::handler::ToolHandler;
use crate::request_logger::tool_request_logging_middleware;

/// Tool server with an HTTP transport over `ToolHandler`.
pub struct McpServer<P, F, T, S, D, G, RT> {
    handler: Arc<ToolHandler<P, F, T, S, D, G, RT>>,
}

#[derive(Debug, Deserialize)]
struct ToolRequest {
    operation: String,
    #[serde(default)]
    params: Value,
}

impl<P, F, T, S, D, G, RT> McpServer<P, F, T, S, D, G, RT>
where
    P: ProjectRepository + Send + Sync + 'static,
    F: FeatureRepository + Send + Sync + 'static,
    T: TaskRepository + Send + Sync + 'static,
    S: SectionRepository + Send + Sync + 'static,
    D: DependencyRepository + Send + Sync + 'static,
    G: TagRepository + Send + Sync + 'static,
    RT: RoleTransitionRepository + Send + Sync + 'static,
{
    pub fn new(handler: ToolHandler<P, F, T, S, D, G, RT>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Unwrap the shared handler, e.g. to drive it from a non-HTTP transport.
    pub fn into_handler(self) -> Arc<ToolHandler<P, F, T, S, D, G, RT>> {
        self.handler
    }

    pub async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_router();
        info!("starting tool server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }

    fn create_router(self) -> Router {
        Router::new()
            .route("/mcp/v1/tool", post(tool_handler::<P, F, T, S, D, G, RT>))
            .route("/health", axum::routing::get(health_handler::<P, F, T, S, D, G, RT>))
            .layer(middleware::from_fn(tool_request_logging_middleware))
            .with_state(self.handler)
    }
}

async fn tool_handler<P, F, T, S, D, G, RT>(
    State(handler): State<Arc<ToolHandler<P, F, T, S, D, G, RT>>>,
    Json(request): Json<ToolRequest>,
) -> Json<Envelope>
where
    P: ProjectRepository + Send + Sync + 'static,
    F: FeatureRepository + Send + Sync + 'static,
    T: TaskRepository + Send + Sync + 'static,
    S: SectionRepository + Send + Sync + 'static,
    D: DependencyRepository + Send + Sync + 'static,
    G: TagRepository + Send + Sync + 'static,
    RT: RoleTransitionRepository + Send + Sync + 'static,
{
    match handler.dispatch(&request.operation, request.params).await {
        Ok(data) => Json(Envelope::success("ok", data, None)),
        Err(err) => Json(Envelope::failure(&err)),
    }
}

async fn health_handler<P, F, T, S, D, G, RT>(
    State(_handler): State<Arc<ToolHandler<P, F, T, S, D, G, RT>>>,
) -> &'static str
where
    P: Send + Sync + 'static,
    F: Send + Sync + 'static,
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
    D: Send + Sync + 'static,
    G: Send + Sync + 'static,
    RT: Send + Sync + 'static,
{
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_swap::ArcSwap;
    use mocks::InMemoryStore;
    use orchestrator_core::workflow_config::WorkflowConfigSnapshot;
    use orchestrator_engine::Engine;

    #[test]
    fn server_creation_does_not_panic() {
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
        let _server = McpServer::new(ToolHandler::new(engine));
    }
}
