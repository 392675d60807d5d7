use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediacat_core::{load_config, validate_config, MediaCatalog};
use mediacat_server::api::create_router;
use mediacat_server::maintenance;
use mediacat_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MEDIACAT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Open the catalog and make sure the well-known containers exist
    let catalog = {
        let database = config.database.clone();
        let catalog_config = config.catalog.clone();
        tokio::task::spawn_blocking(move || -> Result<MediaCatalog> {
            let catalog = MediaCatalog::open(&database, &catalog_config)
                .context("Failed to open catalog")?;
            catalog
                .ensure_well_known_tree()
                .context("Failed to create well-known containers")?;
            Ok(catalog)
        })
        .await
        .context("Catalog initialization task failed")??
    };
    let catalog = Arc::new(catalog);
    info!(
        "Catalog ready (system update id {})",
        catalog.system_update_id().context("Failed to read system update id")?
    );

    // Start maintenance
    let cancel = CancellationToken::new();
    let maintenance_handle = tokio::spawn(maintenance::run(
        Arc::clone(&catalog),
        config.catalog.clone(),
        cancel.clone(),
    ));

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), catalog));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    cancel.cancel();
    let _ = maintenance_handle.await;
    info!("Maintenance stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
