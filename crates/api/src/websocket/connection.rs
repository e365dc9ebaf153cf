//! WebSocket connection handle
//!
//! Represents the push channel of one agent. Frames are queued on a
//! bounded channel and written to the socket by the connection's writer task.

use omnicanal_shared::AgentId;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Represents an open push channel
#[derive(Debug)]
pub struct Connection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Agent the connection belongs to
    pub agent_id: AgentId,

    /// Queue of serialized text frames for the writer task
    sender: mpsc::Sender<String>,

    /// Set once the closing actions have run
    closed: AtomicBool,
}

impl Connection {
    /// Create a new connection
    pub fn new(agent_id: AgentId, sender: mpsc::Sender<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            agent_id,
            sender,
            closed: AtomicBool::new(false),
        }
    }

    /// Serialize a payload and queue it for this connection.
    ///
    /// Never waits: a full queue is reported as [`SendError::Full`].
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }

        let text = serde_json::to_string(payload)?;
        self.sender.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.sender.is_closed()
    }

    /// Mark the connection closed.
    ///
    /// Returns `true` only for the first caller.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

/// Failure to queue a frame on a connection
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
