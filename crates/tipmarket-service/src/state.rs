//! Application state.

use std::sync::Arc;

use tipmarket_engine::SettlementEngine;
use tipmarket_store::RocksStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The settlement engine over the storage backend.
    pub engine: Arc<SettlementEngine<RocksStore>>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(engine: Arc<SettlementEngine<RocksStore>>, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - settlement endpoints are disabled");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not configured - admin endpoints are disabled");
        }

        Self { engine, config }
    }
}
