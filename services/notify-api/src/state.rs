//! Application state for the Notify API service.

use std::sync::Arc;

use curo_db::repo::ProfileRepository;
use curo_db::DbPool;
use curo_notify::Mailer;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Profile lookup for resolving recipient email/name
    pub profiles: Arc<dyn ProfileRepository>,
    /// Outbound email
    pub mailer: Arc<dyn Mailer>,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        mailer: Arc<dyn Mailer>,
        pool: DbPool,
        config: Config,
    ) -> Self {
        Self {
            profiles,
            mailer,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
