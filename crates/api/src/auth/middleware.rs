//! Bearer-token authentication middleware

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use omnicanal_shared::AgentId;

use crate::{error::ApiError, state::AppState};

/// Authenticated agent, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthAgent {
    pub agent_id: AgentId,
}

impl AuthAgent {
    /// Relational id of the agent, for tokens issued from an `agents` row
    pub fn db_id(&self) -> Result<i64, ApiError> {
        self.agent_id.as_str().parse().map_err(|_| ApiError::Forbidden)
    }
}

/// Extract the token from the `Authorization` header.
///
/// Accepts both `Bearer <token>` and a raw token.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Require a valid access token
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(ApiError::MissingToken)?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        ApiError::InvalidToken
    })?;

    request.extensions_mut().insert(AuthAgent {
        agent_id: claims.sub,
    });

    Ok(next.run(request).await)
}
