//! WebSocket handler for Axum
//!
//! Authenticates the upgrade request, then runs one task per connection:
//! a writer draining the connection's queue onto the socket, and a reader
//! handling inbound frames until the socket closes.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use omnicanal_shared::AgentId;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{config::Config, error::ApiError, state::AppState};

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    presence::{agent_id_from_target, PresenceManager},
};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// Per-connection channel settings
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    /// Depth of the outbound frame queue
    pub buffer: usize,
    /// Bound on a single socket write
    pub write_timeout: Duration,
}

impl ChannelSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            buffer: config.notify_buffer,
            write_timeout: config.ws_write_timeout(),
        }
    }
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// The agent id is the last segment of the path and must match the subject
/// of the access token passed as `?token=`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(target): Path<String>,
    Query(params): Query<WebSocketQuery>,
) -> Result<Response, ApiError> {
    let agent_id = agent_id_from_target(&target).map_err(|e| {
        tracing::warn!(connection_target = %target, error = %e, "WebSocket upgrade rejected: bad agent id");
        ApiError::BadRequest(format!("Invalid agent id: {}", e))
    })?;

    let token = params
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::warn!(agent_id = %agent_id, error = %e, "WebSocket auth failed: invalid token");
        ApiError::InvalidToken
    })?;

    if claims.sub != agent_id {
        tracing::warn!(
            agent_id = %agent_id,
            token_subject = %claims.sub,
            "WebSocket auth failed: token issued to another agent"
        );
        return Err(ApiError::Forbidden);
    }

    tracing::info!(agent_id = %agent_id, "WebSocket connection upgrade requested");

    let presence = state.presence.clone();
    let settings = ChannelSettings::from_config(&state.config);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, agent_id, presence, settings)))
}

/// Handle an individual connection until either side closes it
pub async fn handle_socket(
    socket: WebSocket,
    agent_id: AgentId,
    presence: PresenceManager,
    settings: ChannelSettings,
) {
    let (sender, receiver) = socket.split();
    run_connection(sender, receiver, agent_id, presence, settings).await;
}

/// Why a connection's writer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// Every sender of the queue is gone
    Drained,
    /// The socket rejected a write
    Failed,
    /// A write did not finish within the write timeout
    TimedOut,
}

/// Forward queued frames to the socket, each write bounded by `write_timeout`
pub async fn write_frames<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<String>,
    write_timeout: Duration,
    agent_id: AgentId,
) -> WriterExit
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(text) = rx.recv().await {
        match tokio::time::timeout(write_timeout, sink.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(agent_id = %agent_id, error = %e, "WebSocket write failed");
                return WriterExit::Failed;
            }
            Err(_) => {
                tracing::warn!(
                    agent_id = %agent_id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "WebSocket write timed out"
                );
                return WriterExit::TimedOut;
            }
        }
    }
    WriterExit::Drained
}

/// Drive one push channel over an already split socket.
///
/// Registers the agent, runs the writer and reader until either stops, then
/// runs the closing actions.
pub async fn run_connection<W, R, E>(
    sink: W,
    mut stream: R,
    agent_id: AgentId,
    presence: PresenceManager,
    settings: ChannelSettings,
) where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: std::fmt::Display,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(settings.buffer);

    let conn = presence.open(agent_id, tx).await;
    let session_id = conn.session_id;

    let mut send_task = tokio::spawn(write_frames(
        sink,
        rx,
        settings.write_timeout,
        conn.agent_id.clone(),
    ));

    // Reader: inbound frames until close or transport error
    let reader_conn = Arc::clone(&conn);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => handle_text(&reader_conn, &text),
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %reader_conn.session_id, "WebSocket close frame received");
                    break;
                }
                Ok(_) => {} // Ping/pong handled by axum, binary ignored
                Err(e) => {
                    tracing::debug!(session_id = %reader_conn.session_id, error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(session_id = %session_id, agent_id = %conn.agent_id, "WebSocket connection closing");
    presence.close(&conn).await;
}

fn handle_text(conn: &Connection, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::Ping) => {
            if let Err(e) = conn.send(&ServerEvent::Pong) {
                tracing::debug!(session_id = %conn.session_id, error = %e, "Failed to queue pong");
            }
        }
        Err(_) => {
            tracing::debug!(
                agent_id = %conn.agent_id,
                frame = %text,
                "Message received from agent"
            );
        }
    }
}
