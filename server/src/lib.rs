//! Task-orchestration server library
//!
//! Provides process configuration, SQLite store setup, hot-reloadable
//! workflow config, and HTTP/stdio transports around
//! `orchestrator-protocol`'s tool dispatcher.

pub mod config;
pub mod setup;
pub mod stdio;
pub mod telemetry;

pub use config::Config;
pub use setup::{
    create_store, ensure_database_directory, ensure_database_directory_from_config,
    initialize_app, load_workflow_document, start_workflow_config_watch,
};
pub use stdio::serve_stdio;
pub use telemetry::init_telemetry;
