use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::db::{DbHandle, StoreDb};
use super::ws;
use crate::config::LumiereToml;

/// Where and how the storefront server listens.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5050,
            db_path: PathBuf::from(".lumiere/store.db"),
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(config: &LumiereToml) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            db_path: config.server.db_path.clone(),
            dev_mode: config.server.dev,
        }
    }
}

/// Build the full application router: REST API, WebSocket and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::live_updates(ws_upgrade, ws_tx)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the database at `path`, creating its directory first.
pub fn open_database(path: &std::path::Path) -> Result<StoreDb> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    StoreDb::new(path).context("Failed to initialize store database")
}

/// Start the storefront server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig, settings: &LumiereToml) -> Result<()> {
    let db = open_database(&config.db_path)?;
    let (ws_tx, _rx) = broadcast::channel::<String>(256);
    let state = Arc::new(AppState::new(DbHandle::new(db), ws_tx, settings));

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        db = %config.db_path.display(),
        dev = config.dev_mode,
        "Lumiere API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutting down...");
}
