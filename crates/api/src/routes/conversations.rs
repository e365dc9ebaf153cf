//! Conversation assignment and closure

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use omnicanal_shared::{AgentId, Assignment, Closure, Conversation, ConversationStatus, Notification};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use time::OffsetDateTime;

use crate::{
    auth::AuthAgent,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// An assignment of the caller joined with its conversation
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AssignedConversation {
    pub assignment_id: i64,
    pub conversation_id: i64,
    pub channel_id: Option<i64>,
    pub customer_handle: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub assigned_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub closure_reason: String,
}

/// Load a conversation and lock its row for the rest of the transaction
async fn lock_conversation(conn: &mut PgConnection, id: i64) -> ApiResult<Conversation> {
    sqlx::query_as(
        r#"
        SELECT id, channel_id, customer_handle, status, created_at, updated_at
        FROM conversations WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::NotFoundMessage(format!("Conversation {} introuvable.", id)))
}

/// List the caller's assignments, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAgent>,
) -> ApiResult<Json<Vec<AssignedConversation>>> {
    let agent_db_id = auth.db_id()?;

    let rows: Vec<AssignedConversation> = sqlx::query_as(
        r#"
        SELECT a.id AS assignment_id, c.id AS conversation_id, c.channel_id,
               c.customer_handle, c.status, a.assigned_at, a.closed_at
        FROM assignments a
        JOIN conversations c ON c.id = a.conversation_id
        WHERE a.agent_id = $1
        ORDER BY a.assigned_at DESC
        "#,
    )
    .bind(agent_db_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows))
}

/// Assign a conversation to the caller, then notify them
pub async fn assign(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAgent>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Assignment>> {
    let agent_db_id = auth.db_id()?;
    let mut tx = state.pool.begin().await?;

    let conversation = lock_conversation(&mut *tx, id).await?;
    if conversation.status() == ConversationStatus::Closed {
        return Err(ApiError::Conflict(format!("Conversation {} is closed", id)));
    }

    // Reassignment ends the previous agent's assignment
    sqlx::query(
        "UPDATE assignments SET closed_at = NOW() WHERE conversation_id = $1 AND closed_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let assignment: Assignment = sqlx::query_as(
        r#"
        INSERT INTO assignments (conversation_id, agent_id)
        VALUES ($1, $2)
        RETURNING id, conversation_id, agent_id, assigned_at, closed_at
        "#,
    )
    .bind(id)
    .bind(agent_db_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE conversations SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(ConversationStatus::Assigned.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        conversation_id = id,
        agent_id = agent_db_id,
        assignment_id = assignment.id,
        "Conversation assigned"
    );

    state
        .notifier
        .notify(&auth.agent_id, &Notification::assignment(id))
        .await;

    Ok(Json(assignment))
}

/// Close a conversation with a reason
pub async fn close(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthAgent>,
    Path(id): Path<i64>,
    Json(req): Json<CloseRequest>,
) -> ApiResult<Json<Closure>> {
    let reason = req.closure_reason.trim();
    if reason.is_empty() {
        return Err(ApiError::Validation("closure_reason must not be empty".to_string()));
    }

    let mut tx = state.pool.begin().await?;

    let conversation = lock_conversation(&mut *tx, id).await?;
    if conversation.status() == ConversationStatus::Closed {
        return Err(ApiError::Conflict(format!("Conversation {} is already closed", id)));
    }

    sqlx::query("UPDATE conversations SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(ConversationStatus::Closed.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE assignments SET closed_at = NOW() WHERE conversation_id = $1 AND closed_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let closure: Closure = sqlx::query_as(
        r#"
        INSERT INTO closures (conversation_id, closure_reason)
        VALUES ($1, $2)
        RETURNING id, conversation_id, closure_reason, closed_at
        "#,
    )
    .bind(id)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        conversation_id = id,
        agent_id = %auth.agent_id,
        closure_id = closure.id,
        "Conversation closed"
    );

    Ok(Json(closure))
}

/// Agent currently holding the conversation, if any
pub(crate) async fn assigned_agent(state: &AppState, conversation_id: i64) -> ApiResult<Option<AgentId>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT agent_id FROM assignments
        WHERE conversation_id = $1 AND closed_at IS NULL
        ORDER BY assigned_at DESC
        LIMIT 1
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(&state.pool)
    .await?;

    Ok(row.map(|(agent_id,)| AgentId::from(agent_id)))
}
