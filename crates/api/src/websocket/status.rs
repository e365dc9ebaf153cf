//! Agent status lookup

use omnicanal_shared::{AgentId, PresenceStatus};
use std::sync::Arc;

use super::store::{PresenceError, PresenceStore};

/// Read-only view of the presence store
#[derive(Clone)]
pub struct StatusQueryService {
    store: Arc<dyn PresenceStore>,
}

impl StatusQueryService {
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self { store }
    }

    /// Current status of an agent.
    ///
    /// `Ok(None)` means no status was ever recorded, which is distinct from
    /// both "offline" and a store failure.
    pub async fn get_status(&self, agent_id: &AgentId) -> Result<Option<PresenceStatus>, PresenceError> {
        self.store.get_status(agent_id).await
    }

    /// Check the underlying store is reachable
    pub async fn ping(&self) -> Result<(), PresenceError> {
        self.store.ping().await
    }
}
