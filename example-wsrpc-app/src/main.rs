use example_wsrpc_app::{AppState, CHAT_EVENT, handle_event, handle_rpc};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::join;
use tracing_subscriber::EnvFilter;
use wsrpc_encoder_bitcode::BitcodeEncoder;
use wsrpc_tokio_client::{ClientConfig, RpcClient};
use wsrpc_tokio_server::utils::{bind_tcp_listener_on_random_port, ws_url};
use wsrpc_tokio_server::{RpcServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Bind to a random available port
    let (listener, address) = bind_tcp_listener_on_random_port().await?;

    {
        let server = RpcServer::with_context(
            ServerConfig::default().with_encoder(Arc::new(BitcodeEncoder)),
            AppState::default(),
        )
        .on_rpc(handle_rpc)
        .on_event(handle_event);

        // Spawn the server using the pre-bound listener
        let _server_task = tokio::spawn(async move {
            let _ = Arc::new(server).serve_with_listener(listener).await;
        });
    }

    let config = ClientConfig::new(ws_url(address)).with_encoder(Arc::new(BitcodeEncoder));
    let client = RpcClient::connect(config).await?;

    let _chat = client.on_event(CHAT_EVENT, |args: &[Value]| {
        if let [from, line] = args {
            println!("Chat from {from}: {line}");
        }
    });

    // `join!` will await all responses before proceeding
    let (res1, res2, res3) = join!(
        client.rpc("add", vec![json!(1.0), json!(2.0), json!(3.0)]),
        client.rpc("add", vec![json!(8.0), json!(3.0), json!(7.0)]),
        client.rpc("mult", vec![json!(8.0), json!(3.0), json!(7.0)]),
    );

    println!("Result from first add(): {:?}", res1);
    println!("Result from second add(): {:?}", res2);
    println!("Result from first mult(): {:?}", res3);

    let batch = client
        .call_batch(vec![
            ("divide".into(), vec![json!(1), json!(4)]),
            ("divide".into(), vec![json!(1), json!(0)]),
            ("nope".into(), vec![]),
        ])
        .await;
    println!("Result from batch: {:?}", batch);

    client.emit(CHAT_EVENT, vec![json!("hello, everyone")]).await?;
    println!("Calls served: {}", client.rpc("calls", vec![]).await?);

    client.close("demo finished").await;
    Ok(())
}
