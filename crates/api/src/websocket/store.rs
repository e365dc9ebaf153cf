//! Presence store
//!
//! Records agent id -> "online"/"offline" in a Redis hash. Last write wins,
//! no history is kept.

use async_trait::async_trait;
use omnicanal_shared::{AgentId, PresenceStatus};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Presence store errors
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("presence store unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected presence value {0:?}")]
    UnexpectedValue(String),
}

impl From<redis::RedisError> for PresenceError {
    fn from(err: redis::RedisError) -> Self {
        PresenceError::Unreachable(err.to_string())
    }
}

/// Key-value store holding agent presence
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Record an agent's status
    async fn set_status(&self, agent_id: &AgentId, status: PresenceStatus) -> Result<(), PresenceError>;

    /// Read an agent's status; `None` when nothing was ever recorded
    async fn get_status(&self, agent_id: &AgentId) -> Result<Option<PresenceStatus>, PresenceError>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<(), PresenceError> {
        Ok(())
    }
}

fn parse_status(value: String) -> Result<PresenceStatus, PresenceError> {
    value
        .parse()
        .map_err(|_| PresenceError::UnexpectedValue(value))
}

// =============================================================================
// Redis
// =============================================================================

/// Presence store backed by a Redis hash (`HSET`/`HGET`)
#[derive(Clone)]
pub struct RedisPresenceStore {
    conn: ConnectionManager,
    hash_key: String,
}

impl RedisPresenceStore {
    /// Connect to Redis; the connection manager reconnects on its own afterwards
    pub async fn connect(redis_url: &str, hash_key: impl Into<String>) -> Result<Self, PresenceError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            hash_key: hash_key.into(),
        })
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn set_status(&self, agent_id: &AgentId, status: PresenceStatus) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(&self.hash_key, agent_id.as_str(), status.as_str())
            .await?;
        Ok(())
    }

    async fn get_status(&self, agent_id: &AgentId) -> Result<Option<PresenceStatus>, PresenceError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(&self.hash_key, agent_id.as_str()).await?;
        value.map(parse_status).transpose()
    }

    async fn ping(&self) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-process presence store for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryPresenceStore {
    values: RwLock<HashMap<AgentId, String>>,
    unavailable: AtomicBool,
}

impl MemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a raw value, bypassing status validation
    pub fn insert_raw(&self, agent_id: &AgentId, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(agent_id.clone(), value.into());
        }
    }

    fn check_available(&self) -> Result<(), PresenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PresenceError::Unreachable("store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn poisoned<T>(_: T) -> PresenceError {
    PresenceError::Unreachable("presence lock poisoned".to_string())
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn set_status(&self, agent_id: &AgentId, status: PresenceStatus) -> Result<(), PresenceError> {
        self.check_available()?;
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(agent_id.clone(), status.as_str().to_string());
        Ok(())
    }

    async fn get_status(&self, agent_id: &AgentId) -> Result<Option<PresenceStatus>, PresenceError> {
        self.check_available()?;
        let value = self.values.read().map_err(poisoned)?.get(agent_id).cloned();
        value.map(parse_status).transpose()
    }

    async fn ping(&self) -> Result<(), PresenceError> {
        self.check_available()
    }
}
