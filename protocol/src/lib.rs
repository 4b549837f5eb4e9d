//! Tool Dispatcher Protocol
//!
//! Implements the wire surface from `spec.md` §6: a JSON request/response
//! tool protocol with a fixed envelope (`{success, message, data, error,
//! metadata}`), seven named operations, and an HTTP transport built on the
//! teacher's axum router shape.
//!
//! # Overview
//!
//! This crate is the bridge between `orchestrator-engine`'s services and
//! external callers. It provides:
//!
//! - The `{success, message, data, error, metadata}` envelope and its
//!   error-code mapping
//! - `ToolHandler`, dispatching the seven tool operations against an
//!   `orchestrator_engine::Engine`
//! - An axum HTTP transport exposing one POST endpoint plus `/health`
//! - Opaque per-connection session ids for log correlation only
//!
//! # Usage
//!
//! ```no_run
//! use orchestrator_protocol::{McpServer, ToolHandler};
//! use orchestrator_engine::Engine;
//! use orchestrator_core::workflow_config::WorkflowConfigSnapshot;
//! use database::SqliteStore;
//! use arc_swap::ArcSwap;
//! use std::sync::Arc;
//!
//! async fn start_server() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStore::new("orchestrator.db").await?);
//!     let config = Arc::new(ArcSwap::from_pointee(WorkflowConfigSnapshot::defaults()));
//!     let engine = Engine::new(
//!         store.clone(), store.clone(), store.clone(), store.clone(),
//!         store.clone(), store.clone(), store, config,
//!     );
//!     let server = McpServer::new(ToolHandler::new(engine));
//!     server.serve("127.0.0.1:3000").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handler;
pub mod request_logger;
pub mod serialization;
pub mod server;
pub mod session;

pub use error::{Envelope, ToolError};
pub use handler::ToolHandler;
pub use serialization::{deserialize_params, to_data_value};
pub use server::McpServer;
pub use session::SessionId;
