//! Server initialization
//!
//! Contains the main `run()` function that starts all server components.

use super::background_tasks::start_session_sweeper;
use super::config::AppConfig;
use super::loader::load_config;
use super::validation::validate_config;
use crate::api::{api_router, AppState};
use anyhow::{Context, Result};
use pixel_canvas::{EditorSessionManager, ProjectStore};
use pixel_media::{MediaStore, StockPhotoClient, Transformer};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Pixel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    validate_config(&config)?;

    let pool = connect_database(&config).await?;
    let store = Arc::new(ProjectStore::new(pool, config.plans));
    store
        .init()
        .await
        .context("Failed to initialize project store")?;
    info!("Project store initialized");

    let state = build_state(&config, store)?;

    let shutdown = CancellationToken::new();
    start_session_sweeper(
        &state.sessions,
        config.editor.sweep_interval_secs,
        shutdown.clone(),
    );

    let public_path = media_mount_path(&config.media.public_base_url);
    let app = api_router(state.clone());
    let app = match public_path {
        Some(path) => {
            tokio::fs::create_dir_all(&config.media.upload_dir)
                .await
                .context("Failed to create upload directory")?;
            info!(
                "Serving uploads from {} at {}",
                config.media.upload_dir.display(),
                path
            );
            app.nest_service(&path, ServeDir::new(&config.media.upload_dir))
        }
        None => app,
    };
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    let pending = state.sessions.session_count().await;
    if pending > 0 {
        warn!(sessions = pending, "Editor sessions still open at shutdown; pending autosaves dropped");
    }

    info!("Pixel shutdown complete");
    Ok(())
}

/// Build handler state from configuration
fn build_state(config: &AppConfig, store: Arc<ProjectStore>) -> Result<AppState> {
    let stock = StockPhotoClient::new(config.stock.clone())
        .context("Failed to create stock photo client")?;
    if !stock.is_configured() {
        warn!("Stock photo search disabled: no access key");
    }

    Ok(AppState {
        store,
        sessions: Arc::new(EditorSessionManager::new(config.editor.settings())),
        media: Arc::new(MediaStore::new(config.media.clone())),
        stock: Arc::new(stock),
        transformer: Transformer::new(config.media.transform_host.clone()),
    })
}

async fn connect_database(config: &AppConfig) -> Result<SqlitePool> {
    if let Some(path) = sqlite_file_path(&config.database.url) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected: {}", config.database.url);
    Ok(pool)
}

/// File behind a SQLite URL; `None` for in-memory databases
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Route prefix uploads are served under, when they are served locally
fn media_mount_path(public_base_url: &str) -> Option<String> {
    let path = public_base_url.trim_end_matches('/');
    (path.starts_with('/') && path.len() > 1).then(|| path.to_string())
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutdown signal received");
        }
        _ = token.cancelled() => {}
    }
}
