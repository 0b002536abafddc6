//! Integration tests driving the connection manager against a real
//! in-process websocket server.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use agora_client::{ClientError, Config, ConnectionManager, RetryPolicy};
use agora_types::events::TextEvent;
use agora_types::{ClientEvent, EventKind, ServerEvent, Session};

async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base_url = format!("ws://{}", listener.local_addr().expect("addr"));
    (listener, base_url)
}

fn fast_config(base_url: &str) -> Config {
    Config::builder()
        .with_base_url(base_url)
        .with_connect_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::new(
            2,
            Duration::from_millis(10),
            Duration::from_millis(20),
        ))
        .build()
}

#[tokio::test]
async fn connects_sends_and_receives_typed_events() {
    let (listener, base_url) = local_listener().await;

    // Server: accept one client, capture its first frame, answer with a
    // session_initialized event.
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(socket).await.expect("upgrade");
        let first = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("client hung up early: {:?}", other),
            }
        };
        ws.send(Message::Text(
            r#"{"type":"session_initialized","session_id":"abc","user_id":"def"}"#.to_string(),
        ))
        .await
        .expect("server send");
        first
    });

    let manager = ConnectionManager::new(fast_config(&base_url));

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.subscribe(EventKind::SessionInitialized, move |event| {
        let _ = tx.send(event.clone());
    });

    manager.connect().await.expect("connect");

    let session = Session::new("mitosis");
    manager
        .send(ClientEvent::Text(TextEvent::new(
            session.session_id(),
            session.user_id(),
            "What is mitosis?",
        )))
        .await
        .expect("send");

    let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timely event")
        .expect("event");
    match received {
        ServerEvent::SessionInitialized(init) => assert_eq!(init.session_id(), "abc"),
        other => panic!("unexpected event: {:?}", other),
    }

    let wire_text = server.await.expect("server task");
    let frame: serde_json::Value = serde_json::from_str(&wire_text).expect("wire json");
    assert_eq!(frame["type"], "text");
    assert_eq!(frame["text"], "What is mitosis?");
    assert_eq!(frame["session_id"], session.session_id().to_string());

    // The sent counter is bumped by the I/O task right after the flush; give
    // the scheduler a beat before asserting.
    for _ in 0..50 {
        if manager.stats().messages_sent() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(manager.stats().messages_sent(), 1);
    assert_eq!(manager.stats().messages_received(), 1);
    manager.close().await;
}

#[tokio::test]
async fn server_drop_publishes_disconnect_and_fails_sends() {
    let (listener, base_url) = local_listener().await;

    // Server: accept, then drop the connection (and the listener) so every
    // reconnection attempt is refused.
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        let ws = tokio_tungstenite::accept_async(socket).await.expect("upgrade");
        drop(ws);
        drop(listener);
    });

    let manager = Arc::new(ConnectionManager::new(fast_config(&base_url)));

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    manager.subscribe(EventKind::ConnectionStatus, move |event| {
        if let ServerEvent::ConnectionStatus(status) = event {
            let _ = status_tx.send(status.connected());
        }
    });
    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    manager.subscribe(EventKind::Error, move |event| {
        if let ServerEvent::Error(e) = event {
            let _ = error_tx.send(e.clone());
        }
    });

    manager.connect().await.expect("connect");
    server.await.expect("server task");

    let first = tokio::time::timeout(Duration::from_secs(5), status_rx.recv())
        .await
        .expect("status")
        .expect("status");
    assert!(first, "initial transition should be connected");
    let second = tokio::time::timeout(Duration::from_secs(5), status_rx.recv())
        .await
        .expect("status")
        .expect("status");
    assert!(!second, "drop should publish connected:false");

    // Bounded retries against a dead listener must end in a transport error.
    let error = tokio::time::timeout(Duration::from_secs(5), error_rx.recv())
        .await
        .expect("timely error")
        .expect("error");
    assert!(error.is_transport());

    let session = Session::new("mitosis");
    let result = manager
        .send(ClientEvent::Text(TextEvent::new(
            session.session_id(),
            session.user_id(),
            "anyone there?",
        )))
        .await;
    assert!(matches!(result, Err(ClientError::NotConnected)));
    manager.close().await;
}

#[tokio::test]
async fn handshake_that_never_completes_times_out() {
    // A listener that accepts TCP but never answers the websocket upgrade.
    let (listener, base_url) = local_listener().await;
    let holder = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let config = Config::builder()
        .with_base_url(&base_url)
        .with_connect_timeout(Duration::from_millis(200))
        .build();
    let manager = ConnectionManager::new(config);

    let result = manager.connect().await;
    assert!(matches!(result, Err(ClientError::ConnectTimeout)));
    holder.abort();
}

#[tokio::test]
async fn second_connect_without_close_is_rejected() {
    let (listener, base_url) = local_listener().await;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(socket).await.expect("upgrade");
        // Keep the socket open until the client goes away.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let manager = ConnectionManager::new(fast_config(&base_url));
    manager.connect().await.expect("connect");
    let result = manager.connect().await;
    assert!(matches!(result, Err(ClientError::AlreadyConnected)));

    manager.close().await;
    server.abort();
}
