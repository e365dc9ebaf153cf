//! Conversation messages

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use omnicanal_shared::{Message, Notification};
use serde::Deserialize;

use super::conversations::assigned_agent;
use crate::{
    auth::AuthAgent,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct NewMessageRequest {
    pub conversation_id: i64,
    pub content: String,
    pub sender_type: String,
}

/// Post a message, then notify the agent holding the conversation
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAgent>,
    Json(req): Json<NewMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("content must not be empty".to_string()));
    }
    if req.sender_type.trim().is_empty() {
        return Err(ApiError::Validation("sender_type must not be empty".to_string()));
    }

    let sender_id = auth.db_id()?;

    let exists: Option<(bool,)> =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
            .bind(req.conversation_id)
            .fetch_optional(&state.pool)
            .await?;

    if !exists.map(|r| r.0).unwrap_or(false) {
        return Err(ApiError::NotFoundMessage(format!(
            "Conversation {} introuvable.",
            req.conversation_id
        )));
    }

    let message: Message = sqlx::query_as(
        r#"
        INSERT INTO messages (conversation_id, content, sender_type, sender_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, conversation_id, content, sender_type, sender_id, created_at
        "#,
    )
    .bind(req.conversation_id)
    .bind(&req.content)
    .bind(req.sender_type.trim())
    .bind(sender_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        conversation_id = message.conversation_id,
        message_id = message.id,
        sender_id = sender_id,
        "Message created"
    );

    match assigned_agent(&state, message.conversation_id).await {
        Ok(Some(agent_id)) => {
            state
                .notifier
                .notify(&agent_id, &Notification::new_message(message.conversation_id))
                .await;
        }
        Ok(None) => {
            tracing::debug!(conversation_id = message.conversation_id, "No agent assigned, nobody to notify");
        }
        Err(e) => {
            tracing::warn!(conversation_id = message.conversation_id, error = %e, "Could not resolve assigned agent");
        }
    }

    Ok((StatusCode::CREATED, Json(message)))
}

/// Messages of a conversation in chronological order
pub async fn list(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages: Vec<Message> = sqlx::query_as(
        r#"
        SELECT id, conversation_id, content, sender_type, sender_id, created_at
        FROM messages
        WHERE conversation_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(messages))
}
