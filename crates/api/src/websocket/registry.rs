//! Connection registry
//!
//! Maps each agent to its open push channel. At most one connection is
//! registered per agent; registering again replaces the entry without
//! closing the previous connection.

use omnicanal_shared::AgentId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;

/// Registry of open push channels indexed by agent
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<AgentId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any previous one for the same agent.
    ///
    /// Returns the replaced connection, if any.
    pub async fn register(&self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let mut connections = self.connections.write().await;
        let previous = connections.insert(conn.agent_id.clone(), Arc::clone(&conn));

        tracing::info!(
            agent_id = %conn.agent_id,
            session_id = %conn.session_id,
            replaced_session = ?previous.as_ref().map(|p| p.session_id),
            total_connections = connections.len(),
            "Push channel registered"
        );

        previous
    }

    /// Remove the connection registered for an agent, if any
    pub async fn unregister(&self, agent_id: &AgentId) -> Option<Arc<Connection>> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(agent_id);

        if let Some(conn) = &removed {
            tracing::info!(
                agent_id = %agent_id,
                session_id = %conn.session_id,
                remaining_connections = connections.len(),
                "Push channel unregistered"
            );
        }

        removed
    }

    /// Remove the agent's entry only if it still holds the given session.
    ///
    /// Returns `false` when the session was already replaced or removed.
    pub async fn unregister_session(&self, agent_id: &AgentId, session_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(agent_id) {
            Some(current) if current.session_id == session_id => {
                connections.remove(agent_id);
                tracing::info!(
                    agent_id = %agent_id,
                    session_id = %session_id,
                    remaining_connections = connections.len(),
                    "Push channel unregistered"
                );
                true
            }
            _ => false,
        }
    }

    /// Get the connection registered for an agent
    pub async fn lookup(&self, agent_id: &AgentId) -> Option<Arc<Connection>> {
        let connections = self.connections.read().await;
        connections.get(agent_id).cloned()
    }

    /// Every registered connection at this instant
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().cloned().collect()
    }

    pub async fn contains(&self, agent_id: &AgentId) -> bool {
        self.connections.read().await.contains_key(agent_id)
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
