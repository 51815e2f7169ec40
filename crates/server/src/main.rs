use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use videocat_core::{
    create_authenticator, create_view_accounting, load_config, seed_if_empty, validate_config,
    Authenticator, CacheProbe, CatalogEngine, CatalogStore, PageLimits, SqliteCatalogStore,
};
use videocat_server::api::create_router;
use videocat_server::state::AppState;

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
    let config_path = std::env::var("VIDEOCAT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Open catalog store
    let sqlite = Arc::new(
        SqliteCatalogStore::open(&config.database)
            .await
            .context("Failed to open catalog store")?,
    );
    let store: Arc<dyn CatalogStore> = Arc::clone(&sqlite) as Arc<dyn CatalogStore>;
    info!("Catalog store initialized");

    // Cache probe, if configured
    let cache = config
        .cache
        .as_ref()
        .map(CacheProbe::new)
        .transpose()
        .context("Failed to create cache probe")?
        .map(Arc::new);
    if cache.is_none() {
        info!("No cache configured");
    }

    // Seed demo data
    if config.catalog.seed_on_empty {
        seed_if_empty(store.as_ref())
            .await
            .context("Failed to seed catalog")?;
    }

    // Create view accounting and spawn its writer
    let (views, view_writer) = create_view_accounting(Arc::clone(&store));
    let writer_handle = tokio::spawn(view_writer.run());

    // Create app state
    let engine = CatalogEngine::new(store, views, PageLimits::from(&config.catalog));
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        engine,
        cache,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown. The router (and with it every
    // ViewCounter clone) is dropped when this returns.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");

    // Writer exits once the channel is closed and drained
    if let Err(e) = writer_handle.await {
        error!("View writer task failed: {}", e);
    }
    info!("View writer stopped");

    let pool = sqlite.pool_status();
    info!(
        connections = pool.size,
        available = pool.available,
        "Closing catalog store"
    );
    sqlite.close();
    info!("Catalog store closed");

    Ok(())
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
