use example_wsrpc_app::{AppState, CHAT_EVENT, handle_event, handle_rpc};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use wsrpc_tokio_client::{ClientConfig, RpcClient};
use wsrpc_tokio_server::utils::{bind_tcp_listener_on_random_port, ws_url};
use wsrpc_tokio_server::{RpcServer, ServerConfig};

async fn start() -> String {
    let (listener, address) = bind_tcp_listener_on_random_port().await.unwrap();
    let server = RpcServer::with_context(ServerConfig::default(), AppState::default())
        .on_rpc(handle_rpc)
        .on_event(handle_event);
    tokio::spawn(async move {
        let _ = Arc::new(server).serve_with_listener(listener).await;
    });
    ws_url(address)
}

#[tokio::test]
async fn test_arithmetic_methods() {
    let url = start().await;
    let client = RpcClient::connect(ClientConfig::new(url)).await.unwrap();

    assert_eq!(client.rpc("add", vec![json!(1), json!(2.5)]).await.unwrap(), json!(3.5));
    assert_eq!(client.rpc("mult", vec![json!(2), json!(4)]).await.unwrap(), json!(8.0));
    assert_eq!(client.rpc("divide", vec![json!(1), json!(4)]).await.unwrap(), json!(0.25));

    let by_zero = client.rpc("divide", vec![json!(1), json!(0)]).await.unwrap_err();
    assert_eq!(by_zero.code(), Some(1));

    let not_a_number = client.rpc("add", vec![json!("one")]).await.unwrap_err();
    assert_eq!(not_a_number.code(), Some(-32602));

    assert_eq!(client.rpc("calls", vec![]).await.unwrap(), json!(6));
}

#[tokio::test]
async fn test_chat_is_broadcast_to_everyone() {
    let url = start().await;
    let alice = RpcClient::connect(ClientConfig::new(url.clone())).await.unwrap();
    let bob = RpcClient::connect(ClientConfig::new(url)).await.unwrap();

    let heard = Arc::new(Mutex::new(Vec::<Vec<Value>>::new()));
    let _sub = bob.on_event(CHAT_EVENT, {
        let heard = heard.clone();
        move |args: &[Value]| heard.lock().unwrap().push(args.to_vec())
    });

    alice.emit(CHAT_EVENT, vec![json!("hi bob")]).await.unwrap();

    timeout(Duration::from_secs(2), async {
        while heard.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let line = heard.lock().unwrap()[0].clone();
    assert_eq!(line[1], json!("hi bob"));
    assert!(line[0].is_string());
}
