//! Frames exchanged on the push channel besides notifications

use serde::{Deserialize, Serialize};

/// Frames sent by the agent's client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat ping to keep the connection alive
    Ping,
}

/// Control frames sent by the server
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Heartbeat response
    Pong,
}
