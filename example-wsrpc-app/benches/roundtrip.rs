use criterion::{Criterion, criterion_group, criterion_main};
use example_wsrpc_app::{AppState, handle_rpc};
use futures::{StreamExt, stream::FuturesUnordered};
use serde_json::json;
use std::{hint::black_box, sync::Arc};
use tokio::runtime::Runtime;
use wsrpc::SharedEncoder;
use wsrpc_encoder_bitcode::BitcodeEncoder;
use wsrpc_tokio_client::{ClientConfig, RpcClient};
use wsrpc_tokio_server::utils::{bind_tcp_listener_on_random_port, ws_url};
use wsrpc_tokio_server::{RpcServer, ServerConfig};

fn setup(rt: &Runtime, encoders: Vec<SharedEncoder>) -> RpcClient {
    rt.block_on(async {
        let (listener, address) = bind_tcp_listener_on_random_port().await.unwrap();

        let mut server_config = ServerConfig::default();
        let mut client_config = ClientConfig::new(ws_url(address));
        for encoder in encoders {
            server_config = server_config.with_encoder(encoder.clone());
            client_config = client_config.with_encoder(encoder);
        }

        let server = RpcServer::with_context(server_config, AppState::default()).on_rpc(handle_rpc);
        tokio::spawn(async move {
            let _ = Arc::new(server).serve_with_listener(listener).await;
        });

        RpcClient::connect(client_config).await.unwrap()
    })
}

fn bench_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    for (label, encoders) in [
        ("json", Vec::new()),
        ("bitcode", vec![Arc::new(BitcodeEncoder) as SharedEncoder]),
    ] {
        let client = setup(&rt, encoders);

        c.bench_function(&format!("rpc_add_roundtrip_{label}_futures_unordered_10"), |b| {
            b.to_async(&rt).iter(|| async {
                let mut tasks = FuturesUnordered::new();

                // These futures are submitted all at once and polled concurrently.
                for _ in 0..10 {
                    tasks.push(client.rpc("add", vec![json!(1.0), json!(2.0), json!(3.0)]));
                }

                let mut results = Vec::with_capacity(10);
                while let Some(res) = tasks.next().await {
                    results.push(res.unwrap());
                }

                black_box(results);
            });
        });

        c.bench_function(&format!("rpc_add_roundtrip_{label}_batch_10"), |b| {
            b.to_async(&rt).iter(|| async {
                let calls = (0..10)
                    .map(|_| ("add".to_string(), vec![json!(1.0), json!(2.0), json!(3.0)]))
                    .collect();
                black_box(client.call_batch(calls).await);
            });
        });
    }
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
