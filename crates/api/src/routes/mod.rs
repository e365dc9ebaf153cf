//! API routes

pub mod agents;
pub mod conversations;
pub mod health;
pub mod messages;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth::require_auth, state::AppState, websocket::ws_handler};

/// Root greeting
pub async fn welcome() -> &'static str {
    "Welcome to the Omnicanal KAMGOKO's API"
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Public API routes (no auth required) - under /api/v1
    let public_api_routes = Router::new()
        .route("/agents/register", post(agents::register))
        .route("/agents/login", post(agents::login));

    // Protected API routes (auth required) - under /api/v1
    let protected_api_routes = Router::new()
        .route("/agents/status/:id", get(agents::status))
        .route("/conversations", get(conversations::list))
        .route("/conversations/:id/assign", post(conversations::assign))
        .route("/conversations/:id/close", post(conversations::close))
        .route("/messages/new", post(messages::create))
        .route("/messages/conversations/:id/messages", get(messages::list))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // WebSocket routes (auth handled in handler via query parameter)
    let websocket_routes = Router::new().route("/ws/*target", get(ws_handler));

    let api_v1_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes)
        .merge(websocket_routes);

    Router::new()
        .route("/", get(welcome))
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
