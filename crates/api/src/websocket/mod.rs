//! WebSocket push channel for agents
//!
//! Tracks which agents are online and delivers notifications to them:
//! - Presence recorded in the presence store on connect/disconnect
//! - Best-effort delivery of assignment and new-message notifications
//!
//! # Architecture
//!
//! - **Connection**: one agent's open push channel
//! - **Registry**: agent id -> connection, at most one per agent
//! - **Notifier**: pushes a notification to one agent, records misses
//! - **Presence**: connection lifecycle (registry + presence store)
//! - **Store**: presence store backends (Redis, in-memory)
//! - **Status**: read-only agent status lookup
//! - **Handler**: Axum upgrade route and per-connection task

pub mod connection;
pub mod events;
pub mod handler;
pub mod notifier;
pub mod presence;
pub mod registry;
pub mod status;
pub mod store;

pub use connection::Connection;
pub use handler::{run_connection, write_frames, ws_handler, ChannelSettings, WriterExit};
pub use notifier::{DeliveryOutcome, DeliverySnapshot, Notifier};
pub use presence::{agent_id_from_target, PresenceManager};
pub use registry::ConnectionRegistry;
pub use status::StatusQueryService;
pub use store::{MemoryPresenceStore, PresenceError, PresenceStore, RedisPresenceStore};
