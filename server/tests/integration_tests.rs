use orchestrator_server::config::{Config, DatabaseConfig, DomainConfig, LogFormat, LoggingConfig, ServerConfig};
use orchestrator_server::setup::{create_store, ensure_database_directory};
use std::path::PathBuf;
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
async fn test_server_startup_with_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let config = config_with_url(Some(database_url));
    let store = create_store(&config).await;
    assert!(store.is_ok(), "Failed to create store: {:?}", store.err());
}

#[test]
fn test_configuration_loading() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.listen_addr, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
}

#[test]
fn test_environment_overrides() {
    std::env::set_var("DATABASE_URL", "sqlite://test_env.db");
    std::env::set_var("LISTEN_ADDR", "0.0.0.0");
    std::env::set_var("LOG_LEVEL", "debug");

    let config = Config::default().merge_with_env().unwrap();

    assert_eq!(config.database.url, Some("sqlite://test_env.db".to_string()));
    assert_eq!(config.server.listen_addr, "0.0.0.0");
    assert_eq!(config.logging.level, "debug");

    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("LISTEN_ADDR");
    std::env::remove_var("LOG_LEVEL");
}

#[test]
fn test_default_database_path_creation() {
    let config = Config::default();
    let url = config.database_url();
    assert!(url.starts_with("sqlite://"));
    assert!(url.contains(".sqlite"));
}

#[test]
fn test_database_directory_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("subdir").join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let result = ensure_database_directory(&database_url);
    assert!(result.is_ok());
    assert!(db_path.parent().unwrap().exists());
}

#[test]
fn test_config_validation_errors() {
    let mut config = Config::default();

    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());

    config.logging.level = "info".to_string();
    config.database.url = Some("postgres://invalid".to_string());
    assert!(config.validate().is_err());

    config.database.url = None;
    config.server.port = 0;
    assert!(config.validate().is_err());

    config.server.port = 3000;
    config.server.workers = 0;
    assert!(config.validate().is_err());

    config.server.workers = 4;
    config.database.max_connections = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_server_address_formatting() {
    let mut config = config_with_url(None);
    config.server.listen_addr = "0.0.0.0".to_string();
    config.server.port = 8080;
    config.server.workers = 2;
    config.logging.format = LogFormat::Json;

    assert_eq!(config.server_address(), "0.0.0.0:8080");
}

#[tokio::test]
async fn test_store_creation_with_migrations() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("migration_test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let mut config = config_with_url(Some(database_url));
    config.database.max_connections = 3;
    config.database.connection_timeout = 15;

    let store = create_store(&config).await;
    assert!(store.is_ok());
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_multiple_store_instances() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("multi_test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let config = config_with_url(Some(database_url));

    let store1 = create_store(&config).await;
    let store2 = create_store(&config).await;

    assert!(store1.is_ok());
    assert!(store2.is_ok());
}
