//! Shared application state

use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    auth::JwtManager,
    config::Config,
    websocket::{ConnectionRegistry, Notifier, PresenceManager, PresenceStore, StatusQueryService},
};

/// State shared by every request handler and connection task
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub jwt: JwtManager,
    pub registry: Arc<ConnectionRegistry>,
    pub presence: PresenceManager,
    pub notifier: Notifier,
    pub status: StatusQueryService,
}

impl AppState {
    /// Build the state around a fresh connection registry
    pub fn new(config: Config, pool: PgPool, store: Arc<dyn PresenceStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());

        Self {
            jwt: JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours),
            presence: PresenceManager::new(Arc::clone(&registry), Arc::clone(&store)),
            notifier: Notifier::new(Arc::clone(&registry)),
            status: StatusQueryService::new(store),
            registry,
            pool,
            config: Arc::new(config),
        }
    }
}
