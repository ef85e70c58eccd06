use axum::{
    Router,
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    routing::get,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use wsrpc::events::{CONNECTED, DISCONNECTED};
use wsrpc_tokio_client::{ClientConfig, ConnectionState, LifecycleEvent, ReconnectConfig, RpcClient};
use wsrpc_tokio_server::utils::{bind_tcp_listener_on_random_port, ws_url};

/// Answers every JSON request with its first argument.
async fn echo_session(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(text.as_str()).unwrap();
        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": request["params"][0]});
        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}

/// A mock server that closes the first `drops` connections with `close_code`
/// and serves echo on every later one. Returns the URL and the number of
/// accepted connections.
async fn start_mock_server(drops: usize, close_code: u16) -> (String, Arc<AtomicUsize>) {
    let accepted = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/ws",
        get({
            let accepted = accepted.clone();
            move |ws: WebSocketUpgrade| async move {
                let attempt = accepted.fetch_add(1, Ordering::SeqCst);
                ws.protocols(["rpc.json"]).on_upgrade(move |mut socket| async move {
                    if attempt < drops {
                        let frame = CloseFrame {
                            code: close_code,
                            reason: "going away".into(),
                        };
                        let _ = socket.send(Message::Close(Some(frame))).await;
                        return;
                    }
                    echo_session(socket).await;
                })
            }
        }),
    );

    let (listener, address) = bind_tcp_listener_on_random_port().await.unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (ws_url(address), accepted)
}

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        enabled: true,
        wait_min: Duration::from_millis(20),
        wait_max: Duration::from_millis(80),
    }
}

async fn wait_for_state(client: &RpcClient, state: ConnectionState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if client.state() == state {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_client_reconnects_after_abnormal_close() {
    // 1. --- SETUP: THE FIRST CONNECTION IS DROPPED WITH "GOING AWAY" ---
    let (url, accepted) = start_mock_server(1, 1001).await;
    let client = RpcClient::new(ClientConfig::new(url).with_reconnect(fast_reconnect()));

    let notifications = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));
    let mut subscriptions = Vec::new();
    for name in [CONNECTED, DISCONNECTED] {
        let notifications = notifications.clone();
        subscriptions.push(client.on_lifecycle(name, move |event: &LifecycleEvent| {
            notifications.lock().unwrap().push(event.name())
        }));
    }

    // 2. --- WAIT FOR THE SECOND CONNECTION ---
    client.open().await.unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !(accepted.load(Ordering::SeqCst) == 2 && client.is_connected()) && Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    let result = client.rpc("echo", vec![json!("after reconnect")]).await.unwrap();

    // 3. --- ASSERT ---
    assert_eq!(result, json!("after reconnect"));
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    assert!(client.is_connected());
    assert_eq!(
        *notifications.lock().unwrap(),
        vec![CONNECTED, DISCONNECTED, CONNECTED]
    );
}

#[tokio::test]
async fn test_normal_close_from_server_does_not_reconnect() {
    let (url, accepted) = start_mock_server(1, 1000).await;
    let client = RpcClient::connect(ClientConfig::new(url).with_reconnect(fast_reconnect()))
        .await
        .unwrap();

    assert!(wait_for_state(&client, ConnectionState::Closed).await);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_disabled_reconnect_stays_closed() {
    let (url, accepted) = start_mock_server(1, 1001).await;
    let config = ClientConfig::new(url).with_reconnect(ReconnectConfig::disabled());
    let client = RpcClient::connect(config).await.unwrap();

    assert!(wait_for_state(&client, ConnectionState::Closed).await);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_during_backoff_is_terminal() {
    // Every connection is dropped, so the client keeps backing off.
    let (url, _accepted) = start_mock_server(usize::MAX, 1001).await;
    let reconnect = ReconnectConfig {
        enabled: true,
        wait_min: Duration::from_millis(500),
        wait_max: Duration::from_millis(500),
    };
    let client = RpcClient::connect(ClientConfig::new(url).with_reconnect(reconnect))
        .await
        .unwrap();

    // Let the first connection drop so the client is waiting to retry.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(client.state(), ConnectionState::Connecting);
    client.close("giving up").await;
    assert_eq!(client.state(), ConnectionState::Closed);
}
