//! Agent registration, login and presence lookup

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use omnicanal_shared::{Agent, AgentId};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{hash_password, validate_password, verify_password},
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_USERNAME_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct AgentStatusResponse {
    pub agent_id: AgentId,
    pub status: String,
}

/// Create a new agent account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let username = req.username.trim().to_string();
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::Validation(
            "Username must be between 1 and 255 characters".to_string(),
        ));
    }

    validate_password(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "register: hashing task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "register: failed to hash password");
            ApiError::Internal
        })?;

    let agent: Agent = sqlx::query_as(
        r#"
        INSERT INTO agents (username, password_hash)
        VALUES ($1, $2)
        RETURNING id, username, password_hash, created_at
        "#,
    )
    .bind(&username)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("Username already taken".to_string()),
        other => other,
    })?;

    tracing::info!(agent_id = agent.id, username = %agent.username, "Agent registered");

    Ok((StatusCode::CREATED, Json(agent)))
}

/// Exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let agent: Option<Agent> = sqlx::query_as(
        "SELECT id, username, password_hash, created_at FROM agents WHERE username = $1",
    )
    .bind(req.username.trim())
    .fetch_optional(&state.pool)
    .await?;

    let Some(agent) = agent else {
        tracing::info!(username = %req.username, "login: unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    let password = req.password;
    let hash = agent.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "login: verification task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!(agent_id = agent.id, error = %e, "login: stored hash is unreadable");
            ApiError::Internal
        })?;

    if !valid {
        tracing::info!(agent_id = agent.id, "login: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let agent_id = AgentId::from(agent.id);
    let token = state.jwt.generate_access_token(&agent_id).map_err(|e| {
        tracing::error!(agent_id = %agent_id, error = %e, "login: failed to issue token");
        ApiError::Internal
    })?;

    tracing::info!(agent_id = %agent_id, "Agent logged in");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
    }))
}

/// Read an agent's last recorded presence
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentStatusResponse>> {
    let agent_id = AgentId::parse(&id)
        .map_err(|_| ApiError::NotFoundMessage(format!("Statut de l'agent {} introuvable.", id)))?;

    match state.status.get_status(&agent_id).await? {
        Some(status) => Ok(Json(AgentStatusResponse {
            agent_id,
            status: status.to_string(),
        })),
        None => Err(ApiError::NotFoundMessage(format!(
            "Statut de l'agent {} introuvable.",
            agent_id
        ))),
    }
}
