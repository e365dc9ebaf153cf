//! End-to-end push channel tests over a real socket

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use omnicanal_api::{routes::create_router, serve, websocket::PresenceStore, AppState};
use omnicanal_shared::{Notification, PresenceStatus};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use common::{agent, test_state, token_for};

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let app = create_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

fn ws_url(addr: SocketAddr, target: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => format!("ws://{}/api/v1/ws/{}?token={}", addr, target, token),
        None => format!("ws://{}/api/v1/ws/{}", addr, target),
    }
}

/// Poll until the condition holds or a second has passed
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn rejection_status(err: tungstenite::Error) -> u16 {
    match err {
        tungstenite::Error::Http(response) => response.status().as_u16(),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_notification_reaches_connected_agent() {
    let (state, store) = test_state();
    let addr = spawn_server(state.clone()).await;
    let id = agent("agent-42");
    let token = token_for(&state, "agent-42");

    let (mut socket, _) = connect_async(ws_url(addr, "agent-42", Some(&token)))
        .await
        .expect("handshake failed");

    let registry = state.registry.clone();
    let watched = id.clone();
    assert!(eventually(|| {
        let registry = registry.clone();
        let watched = watched.clone();
        async move { registry.contains(&watched).await }
    })
    .await);
    assert_eq!(store.get_status(&id).await.unwrap(), Some(PresenceStatus::Online));

    state.notifier.notify(&id, &Notification::assignment(12)).await;

    let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("no frame received")
        .expect("socket closed")
        .expect("read failed");
    let Message::Text(text) = frame else {
        panic!("expected text frame, got {frame:?}");
    };
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "assignment");
    assert_eq!(value["conversation_id"], 12);

    socket.close(None).await.unwrap();

    let store_handle = store.clone();
    let offline_id = id.clone();
    assert!(eventually(|| {
        let store = store_handle.clone();
        let id = offline_id.clone();
        async move { store.get_status(&id).await.ok().flatten() == Some(PresenceStatus::Offline) }
    })
    .await);
    assert!(state.registry.is_empty().await);
}

#[tokio::test]
async fn test_ping_gets_pong() {
    let (state, _store) = test_state();
    let addr = spawn_server(state.clone()).await;
    let token = token_for(&state, "agent-7");

    let (mut socket, _) = connect_async(ws_url(addr, "agent-7", Some(&token)))
        .await
        .expect("handshake failed");

    socket
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();
    // Unrecognised frames are ignored
    socket.send(Message::Text("hello".to_string())).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("no frame received")
        .expect("socket closed")
        .expect("read failed");
    assert_eq!(frame, Message::Text(r#"{"type":"pong"}"#.to_string()));
}

#[tokio::test]
async fn test_handshake_rejections() {
    let (state, store) = test_state();
    let addr = spawn_server(state.clone()).await;
    let other_token = token_for(&state, "agent-1");

    let missing = connect_async(ws_url(addr, "agent-42", None)).await.unwrap_err();
    assert_eq!(rejection_status(missing), 403);

    let invalid = connect_async(ws_url(addr, "agent-42", Some("not-a-jwt")))
        .await
        .unwrap_err();
    assert_eq!(rejection_status(invalid), 401);

    let mismatched = connect_async(ws_url(addr, "agent-42", Some(&other_token)))
        .await
        .unwrap_err();
    assert_eq!(rejection_status(mismatched), 403);

    let malformed = connect_async(ws_url(addr, "bad%20id", Some(&other_token)))
        .await
        .unwrap_err();
    assert_eq!(rejection_status(malformed), 400);

    assert!(state.registry.is_empty().await);
    assert_eq!(store.get_status(&agent("agent-42")).await.unwrap(), None);
}

#[tokio::test]
async fn test_shutdown_marks_connected_agents_offline() {
    let (state, store) = test_state();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state.clone(), async move {
        stop_rx.await.ok();
    }));

    let id = agent("agent-42");
    let token = token_for(&state, "agent-42");
    let (_socket, _) = connect_async(ws_url(addr, "agent-42", Some(&token)))
        .await
        .expect("handshake failed");

    let registry = state.registry.clone();
    let watched = id.clone();
    assert!(eventually(|| {
        let registry = registry.clone();
        let watched = watched.clone();
        async move { registry.contains(&watched).await }
    })
    .await);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    // The client socket is still open, yet the agent is recorded offline
    assert!(state.registry.is_empty().await);
    assert_eq!(store.get_status(&id).await.unwrap(), Some(PresenceStatus::Offline));
}
