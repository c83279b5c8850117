//! HTTP server for the nearby discovery backend
//!
//! Serves the `/api/v1` nearby, location and auth endpoints over an
//! in-memory document store.

pub mod auth;
pub mod routes;
pub mod state;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::DocumentStore;
use routes::create_router;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Build the document store, loading the configured seed file if any
pub async fn load_store(config: &Config) -> Result<DocumentStore> {
    let store = DocumentStore::new();
    match &config.nearby.seed_path {
        Some(path) => {
            store.load_seed(path).await?;
        }
        None => warn!("nearby.seed_path is not set, starting with an empty store"),
    }
    Ok(store)
}

/// Start the HTTP server
///
/// Never returns unless the server shuts down
pub async fn run(config: Config) -> Result<()> {
    let addr = config.server_addr();
    run_on(&addr, config).await
}

/// Start the HTTP server with a specific address
pub async fn run_on(addr: &str, config: Config) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Server(format!("Invalid server address: {}", e)))?;

    let store = load_store(&config).await?;
    let state = Arc::new(AppState::with_store(config, store));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Server(format!("Server error: {}", e)))?;

    Ok(())
}
