use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use database::SqliteStore;
use notify::{RecursiveMode, Watcher};
use orchestrator_core::workflow_config::{WorkflowConfigDocument, WorkflowConfigSnapshot};
use orchestrator_engine::Engine;
use orchestrator_protocol::{McpServer, ToolHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

type OrchestratorServer = McpServer<
    SqliteStore,
    SqliteStore,
    SqliteStore,
    SqliteStore,
    SqliteStore,
    SqliteStore,
    SqliteStore,
>;

/// Create the SQLite-backed store and apply schema migrations.
pub async fn create_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let database_url = config.database_url();
    info!("Initializing SQLite store at: {}", database_url);

    let store = SqliteStore::new(&database_url)
        .await
        .context("Failed to create SQLite store")?;

    info!("Running database migrations");
    store
        .migrate()
        .await
        .context("Failed to run database migrations")?;

    Ok(Arc::new(store))
}

/// Read `config.yaml` and `status-workflow-config.yaml` (if present),
/// merge them (the status-workflow document's sections take precedence,
/// per `spec.md` §6), and fall back to built-in defaults for any file
/// that is missing. A malformed file surfaces a `ConfigError` and the
/// previous snapshot (if any) is left untouched by the caller.
pub fn load_workflow_document(config: &Config) -> Result<WorkflowConfigDocument> {
    let base = read_yaml_or_default(&config.domain.config_path)?;
    let overlay = read_yaml_or_default(&config.domain.status_workflow_path)?;
    let merged = base.merge(overlay);
    if merged.status_progression.is_empty() {
        // Neither file was present (or neither declared a progression):
        // fall back to the full built-in defaults rather than leaving
        // every status unmapped to a role.
        Ok(WorkflowConfigDocument::defaults().merge(merged))
    } else {
        Ok(merged)
    }
}

fn read_yaml_or_default(path: &Path) -> Result<WorkflowConfigDocument> {
    match std::fs::read_to_string(path) {
        Ok(raw) => WorkflowConfigDocument::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse workflow config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("workflow config {} not found; using defaults", path.display());
            Ok(WorkflowConfigDocument::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Build the hot-reloadable workflow config handle and start a
/// filesystem watcher that republishes a new snapshot on every change to
/// either domain document (spec.md §4.1 "hot-reload on file change with
/// atomic swap; readers always see a consistent snapshot").
///
/// The returned `Watcher` must be kept alive for the duration of the
/// process; dropping it stops the watch.
pub fn start_workflow_config_watch(
    config: &Config,
) -> Result<(Arc<ArcSwap<WorkflowConfigSnapshot>>, Option<notify::RecommendedWatcher>)> {
    let initial = load_workflow_document(config)?;
    let handle = Arc::new(ArcSwap::from_pointee(WorkflowConfigSnapshot::from_document(initial)));

    let config_path = config.domain.config_path.clone();
    let status_path = config.domain.status_workflow_path.clone();
    let watched: Vec<PathBuf> = [&config_path, &status_path]
        .into_iter()
        .filter(|p| p.exists())
        .cloned()
        .collect();

    if watched.is_empty() {
        warn!("no workflow config files present on disk; hot-reload watcher not started");
        return Ok((handle, None));
    }

    let reload_handle = handle.clone();
    let reload_config = config.clone();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        let Ok(event) = event else { return };
        if !event.kind.is_modify() && !event.kind.is_create() {
            return;
        }
        match load_workflow_document(&reload_config) {
            Ok(doc) => {
                reload_handle.store(Arc::new(WorkflowConfigSnapshot::from_document(doc)));
                info!("workflow config reloaded");
            }
            Err(e) => {
                warn!(error = %e, "workflow config reload failed; keeping previous snapshot");
            }
        }
    })
    .context("failed to create workflow config watcher")?;

    for path in &watched {
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;
    }

    Ok((handle, Some(watcher)))
}

/// Construct the `Engine` and the tool server around one shared
/// `SqliteStore` (which implements every repository trait the engine
/// needs) plus the hot-reloadable workflow config handle.
pub async fn initialize_app(
    config: &Config,
) -> Result<(OrchestratorServer, Option<notify::RecommendedWatcher>)> {
    info!("Initializing application");

    let store = create_store(config).await.context("Failed to create store")?;
    let (workflow_config, watcher) =
        start_workflow_config_watch(config).context("Failed to load workflow config")?;

    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        workflow_config,
    );

    let server = McpServer::new(ToolHandler::new(engine));
    info!("Application initialized successfully");
    Ok((server, watcher))
}

/// Ensure the database directory exists using config
pub fn ensure_database_directory_from_config(config: &Config) -> Result<()> {
    let database_url = config.database_url();
    ensure_database_directory(&database_url)
}

/// Ensure the database directory exists
pub fn ensure_database_directory(database_url: &str) -> Result<()> {
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating database directory: {}", parent.display());
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, DomainConfig, LogFormat, LoggingConfig, ServerConfig};
    use tempfile::TempDir;

    fn config_with_url(database_url: Option<String>) -> Config {
        Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections: 5,
                connection_timeout: 30,
            },
            server: ServerConfig {
                listen_addr: "127.0.0.1".to_string(),
                port: 3000,
                workers: 4,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            domain: DomainConfig {
                config_path: PathBuf::from("/nonexistent/config.yaml"),
                status_workflow_path: PathBuf::from("/nonexistent/status-workflow-config.yaml"),
            },
        }
    }

    #[tokio::test]
    async fn test_create_store_with_custom_url() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let config = config_with_url(Some(database_url));
        let store = create_store(&config).await;
        assert!(store.is_ok());
    }

    #[test]
    fn test_ensure_database_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("subdir").join("test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let result = ensure_database_directory(&database_url);
        assert!(result.is_ok());
        assert!(db_path.parent().unwrap().exists());
    }

    #[test]
    fn missing_workflow_config_files_fall_back_to_defaults() {
        let config = config_with_url(None);
        let doc = load_workflow_document(&config).unwrap();
        assert!(doc.status_progression.contains_key("task"));
    }

    #[test]
    fn watch_is_skipped_when_no_files_present() {
        let config = config_with_url(None);
        let (_handle, watcher) = start_workflow_config_watch(&config).unwrap();
        assert!(watcher.is_none());
    }
}
