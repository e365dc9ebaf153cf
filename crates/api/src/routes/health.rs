//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{state::AppState, websocket::DeliverySnapshot};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub presence_store: String,
    pub connected_agents: usize,
    pub notifications: DeliverySnapshot,
}

fn label(healthy: bool) -> String {
    let label = if healthy { "healthy" } else { "unhealthy" };
    label.to_string()
}

async fn database_ok(state: &AppState) -> bool {
    sqlx::query("SELECT 1").execute(&state.pool).await.is_ok()
}

async fn presence_ok(state: &AppState) -> bool {
    match state.status.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Presence store health check failed");
            false
        }
    }
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = database_ok(&state).await;
    let presence_healthy = presence_ok(&state).await;

    let overall_status = if db_healthy && presence_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        overall_status,
        Json(HealthResponse {
            status: label(overall_status == StatusCode::OK),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: label(db_healthy),
            presence_store: label(presence_healthy),
            connected_agents: state.registry.len().await,
            notifications: state.notifier.stats(),
        }),
    )
}

/// Liveness probe (just returns 200 if the server is running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe (checks if the service is ready to accept traffic)
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if database_ok(&state).await && presence_ok(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
