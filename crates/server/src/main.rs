use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seedarr_core::{
    config::LoggingConfig, load_config, validate_config, JobScheduler, Orchestrator,
    OrchestratorConfig, SeedrApi, SeedrClient, SqliteTorrentStore, TorrentStore,
};
use seedarr_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("SEEDARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_logging(&config.logging);
    info!("Loaded configuration from {:?}", config_path);

    validate_config(&config).context("Configuration validation failed")?;

    info!("Database path: {:?}", config.database.path);

    let orchestrator_config = OrchestratorConfig::from_config(&config);
    for dir in orchestrator_config.directories() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    let store: Arc<dyn TorrentStore> = Arc::new(
        SqliteTorrentStore::new(&config.database.path)
            .context("Failed to create torrent store")?,
    );
    info!("Torrent store initialized");

    let seedr: Arc<dyn SeedrApi> = Arc::new(
        SeedrClient::new(config.seedr.clone()).context("Failed to create Seedr client")?,
    );
    info!("Using Seedr at {}", config.seedr.url);

    let orchestrator = Orchestrator::new(orchestrator_config, store, seedr);
    let scheduler = Arc::new(JobScheduler::new(orchestrator, config.scheduler.clone()));

    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        info!("Scheduler disabled in config");
    }

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&scheduler)));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if scheduler.is_running() {
        scheduler.stop().await;
    }

    Ok(())
}

/// RUST_LOG wins over the configured filter.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
