//! Presence manager
//!
//! Ties a push channel's lifecycle to the connection registry and the
//! presence store:
//!
//! - **open**: register the connection, then record "online"
//! - **close**: unregister the connection, then record "offline"
//!
//! The registry lock is never held while the store is awaited. Store
//! failures are logged and never propagated: presence is advisory.

use omnicanal_shared::{AgentId, InvalidAgentId, PresenceStatus};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::connection::Connection;
use super::registry::ConnectionRegistry;
use super::store::PresenceStore;

/// Extract the agent id from a connection target (the last path segment).
///
/// Query string and fragment are ignored. Empty or malformed ids are rejected.
pub fn agent_id_from_target(target: &str) -> Result<AgentId, InvalidAgentId> {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    AgentId::parse(segment)
}

/// Opens and closes agent push channels
#[derive(Clone)]
pub struct PresenceManager {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn PresenceStore>,
}

impl PresenceManager {
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn PresenceStore>) -> Self {
        Self { registry, store }
    }

    /// Register a new connection for `agent_id` and mark the agent online.
    ///
    /// A connection already registered for the agent is replaced but left open.
    pub async fn open(&self, agent_id: AgentId, sender: mpsc::Sender<String>) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(agent_id, sender));

        if let Some(previous) = self.registry.register(Arc::clone(&conn)).await {
            tracing::info!(
                agent_id = %conn.agent_id,
                session_id = %conn.session_id,
                previous_session = %previous.session_id,
                "Push channel superseded by a new connection"
            );
        }

        self.record(&conn.agent_id, PresenceStatus::Online).await;
        conn
    }

    /// Run the closing actions for a connection.
    ///
    /// Only the first call per connection does anything; later calls return
    /// `false`. A connection that was superseded leaves the registry and the
    /// store untouched, since the agent is still online through its newer
    /// connection.
    pub async fn close(&self, conn: &Connection) -> bool {
        if !conn.mark_closed() {
            tracing::debug!(
                agent_id = %conn.agent_id,
                session_id = %conn.session_id,
                "Push channel already closed"
            );
            return false;
        }

        if !self
            .registry
            .unregister_session(&conn.agent_id, conn.session_id)
            .await
        {
            tracing::debug!(
                agent_id = %conn.agent_id,
                session_id = %conn.session_id,
                "Superseded push channel closed"
            );
            return true;
        }

        self.record(&conn.agent_id, PresenceStatus::Offline).await;

        // A replacement may have registered and written "online" while the
        // offline write was in flight.
        if self.registry.contains(&conn.agent_id).await {
            self.record(&conn.agent_id, PresenceStatus::Online).await;
        }

        true
    }

    /// Close every registered connection, marking each agent offline.
    ///
    /// Used on server shutdown, where upgraded sockets outlive the HTTP
    /// server. Returns how many connections this call closed.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for conn in self.registry.snapshot().await {
            if self.close(&conn).await {
                closed += 1;
            }
        }

        tracing::info!(closed_connections = closed, "Closed all push channels");
        closed
    }

    async fn record(&self, agent_id: &AgentId, status: PresenceStatus) {
        match self.store.set_status(agent_id, status).await {
            Ok(()) => tracing::debug!(agent_id = %agent_id, status = %status, "Presence recorded"),
            Err(e) => tracing::error!(
                agent_id = %agent_id,
                status = %status,
                error = %e,
                "Failed to record presence"
            ),
        }
    }
}
