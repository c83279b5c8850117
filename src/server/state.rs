//! Server shared state

use crate::config::Config;
use crate::server::auth::TokenIssuer;
use crate::store::DocumentStore;

/// Shared state for the HTTP server
#[derive(Debug)]
pub struct AppState {
    pub config: Config,

    /// Events, hobbies and per-user location records
    pub store: DocumentStore,

    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, DocumentStore::new())
    }

    pub fn with_store(config: Config, store: DocumentStore) -> Self {
        let tokens = TokenIssuer::from_config(&config.auth);
        Self {
            config,
            store,
            tokens,
        }
    }

    /// Nearby radius used when the request gives none
    pub fn default_radius_km(&self) -> f64 {
        self.config.nearby.default_radius_km
    }

    pub fn max_results(&self) -> usize {
        self.config.nearby.max_results
    }
}
