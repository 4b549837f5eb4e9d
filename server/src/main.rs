mod config;
mod setup;
mod stdio;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use setup::{ensure_database_directory_from_config, initialize_app};
use telemetry::{init_telemetry, log_config_validation, log_startup_info};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "orchestrator-server")]
#[command(about = "Task-orchestration backend: dependency-aware scheduling over Projects/Features/Tasks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Start the tool server over HTTP (default). Mutually exclusive with --stdio.
    #[arg(long)]
    start: bool,

    /// Run the tool server over a stdio line protocol instead of HTTP.
    #[arg(long)]
    stdio: bool,

    /// Port to listen on (HTTP mode only)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Process configuration file path (TOML)
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Path to config.yaml (status_progression / completion_cleanup base document)
    #[arg(long, env = "ORCHESTRATOR_CONFIG_YAML")]
    config_yaml: Option<String>,

    /// Path to status-workflow-config.yaml (overlaid on config.yaml)
    #[arg(long, env = "ORCHESTRATOR_STATUS_WORKFLOW_YAML")]
    status_workflow_yaml: Option<String>,

    /// Database URL override, e.g. sqlite:///path/to/orchestrator.sqlite
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Listen address override (default: 127.0.0.1)
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => {
            info!("Loading configuration from file: {}", config_file);
            Config::from_file(config_file)?
        }
        None => {
            info!("Loading configuration from environment");
            Config::from_env()?
        }
    };

    if let Some(ref database_url) = cli.database_url {
        info!("Overriding database URL from CLI");
        config.database.url = Some(database_url.clone());
    }

    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }

    config.server.port = cli.port;

    if let Some(ref config_yaml) = cli.config_yaml {
        config.domain.config_path = config_yaml.into();
    }
    if let Some(ref status_workflow_yaml) = cli.status_workflow_yaml {
        config.domain.status_workflow_path = status_workflow_yaml.into();
    }

    info!("Server will listen on: {}", config.server_address());

    if let Some(ref log_level) = cli.log_level {
        info!("Overriding log level from CLI");
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if !cli.start && !cli.stdio {
        println!("Task-orchestration backend");
        println!();
        println!("Usage:");
        println!("  orchestrator-server --start --port=3000 --database-url=sqlite://./orchestrator.sqlite");
        println!("  orchestrator-server --stdio --database-url=sqlite://./orchestrator.sqlite");
        println!();
        println!("For more options, use: orchestrator-server --help");
        return Ok(());
    }

    let config = load_config(&cli).context("Failed to load configuration")?;

    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;
    log_config_validation(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    ensure_database_directory_from_config(&config).context("Failed to create database directory")?;

    if cli.stdio {
        return run_stdio(&config).await;
    }

    info!("Starting tool server (HTTP)");
    info!("Server: http://{}", config.server_address());

    let (server, _watcher) = initialize_app(&config)
        .await
        .context("Failed to initialize application")?;

    println!("Tool server is ready!");
    println!("  Listening on: http://{}", config.server_address());
    println!();
    println!("Press Ctrl+C to shutdown");
    println!();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                    .expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        let _ = shutdown_tx.send(());
    });

    let server_addr = config.server_address();
    tokio::select! {
        result = server.serve(&server_addr) => {
            match result {
                Ok(_) => {
                    info!("tool server shut down cleanly");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "tool server error");
                    std::process::exit(3);
                }
            }
        }
        _ = shutdown_rx => {
            info!("Shutdown signal received, stopping server");
            Ok(())
        }
    }
}

async fn run_stdio(config: &Config) -> Result<()> {
    info!("Starting tool server (stdio)");
    let (server, _watcher) = initialize_app(config)
        .await
        .context("Failed to initialize application")?;
    stdio::serve_stdio(server.into_handler()).await
}
