//! Common types used across Omnicanal

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Longest agent identifier accepted on the push channel
pub const MAX_AGENT_ID_LEN: usize = 128;

/// Agent identifier
///
/// Opaque string key shared by the REST layer (where agents are `BIGINT`
/// rows) and the push layer (where the id is the last segment of the
/// connection target). Stable across connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Parse a raw identifier.
    ///
    /// Accepts 1 to [`MAX_AGENT_ID_LEN`] characters from `[A-Za-z0-9_.-]`.
    pub fn parse(raw: &str) -> Result<Self, InvalidAgentId> {
        if raw.is_empty() {
            return Err(InvalidAgentId::Empty);
        }
        if raw.len() > MAX_AGENT_ID_LEN {
            return Err(InvalidAgentId::TooLong(raw.len()));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(InvalidAgentId::InvalidChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for AgentId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = InvalidAgentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Why a raw agent identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAgentId {
    #[error("agent id is empty")]
    Empty,
    #[error("agent id is {0} characters long (max 128)")]
    TooLong(usize),
    #[error("agent id contains invalid character {0:?}")]
    InvalidChar(char),
}

// =============================================================================
// Presence
// =============================================================================

/// Online status of an agent as recorded in the presence store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Invalid presence status: {:?}", s)),
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Kind of push notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A conversation was assigned to the agent
    Assignment,
    /// A message was posted in a conversation the agent handles
    NewMessage,
}

/// Push notification payload
///
/// Built by the assignment and message flows after their own writes
/// commit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: i64) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Notification sent to an agent who just took a conversation
    pub fn assignment(conversation_id: i64) -> Self {
        Self::new(
            NotificationKind::Assignment,
            format!("Nouvelle conversation assignée : {}", conversation_id),
        )
        .with_conversation(conversation_id)
    }

    /// Notification sent to the assigned agent when a message arrives
    pub fn new_message(conversation_id: i64) -> Self {
        Self::new(
            NotificationKind::NewMessage,
            format!("Nouveau message dans la conversation {}", conversation_id),
        )
        .with_conversation(conversation_id)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a conversation
///
/// Stored as its lowercase name in `conversations.status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Assigned,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid conversation status: {}", s)),
        }
    }
}

// =============================================================================
// Database Models
// =============================================================================

/// Support agent
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agent {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Customer conversation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    /// Originating channel (email, whatsapp, web chat...)
    pub channel_id: Option<i64>,
    pub customer_handle: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Conversation {
    /// Parsed status; unknown values are treated as open
    pub fn status(&self) -> ConversationStatus {
        self.status.parse().unwrap_or(ConversationStatus::Open)
    }
}

/// Message exchanged within a conversation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub content: String,
    pub sender_type: String,
    pub sender_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Agent taking charge of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: i64,
    pub conversation_id: i64,
    pub agent_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub assigned_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
}

/// Recorded reason a conversation was closed
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Closure {
    pub id: i64,
    pub conversation_id: i64,
    pub closure_reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub closed_at: OffsetDateTime,
}
