//! HTTP server lifecycle

use std::future::Future;

use tokio::net::TcpListener;

use crate::{routes::create_router, state::AppState};

/// Serve the API until `shutdown` resolves.
///
/// Upgraded push channels are not tracked by the HTTP server, so once it
/// stops every channel still registered is closed and its agent recorded
/// offline before this returns.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let presence = state.presence.clone();
    let app = create_router(state);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    presence.close_all().await;

    result
}
