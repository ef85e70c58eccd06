use serde_json::json;
use tokio::sync::mpsc;
use wsrpc::json_encoder;
use wsrpc_tokio_server::{ClientHandle, ClientRegistry, OutboundFrame};

fn client(id: &str) -> (ClientHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ClientHandle::new(id, json_encoder(), tx), rx)
}

#[tokio::test]
async fn test_sweep_pings_then_evicts_silent_clients() {
    let registry = ClientRegistry::new();
    let (responsive, mut responsive_rx) = client("responsive");
    let (silent, mut silent_rx) = client("silent");
    registry.insert(responsive.clone()).await;
    registry.insert(silent.clone()).await;

    // First cycle: everyone starts alive, so everyone is pinged.
    assert!(registry.sweep().await.is_empty());
    assert_eq!(responsive_rx.recv().await, Some(OutboundFrame::Ping));
    assert_eq!(silent_rx.recv().await, Some(OutboundFrame::Ping));
    assert!(!silent.is_alive());

    // Only one of them answers.
    responsive.mark_alive();

    let evicted = registry.sweep().await;
    assert_eq!(evicted, vec!["silent".to_string()]);
    assert!(registry.contains("responsive").await);
    assert!(!registry.contains("silent").await);
    assert_eq!(responsive_rx.recv().await, Some(OutboundFrame::Ping));
}

#[tokio::test]
async fn test_sweep_tolerates_clients_vanishing() {
    let registry = ClientRegistry::new();
    let (gone, gone_rx) = client("gone");
    registry.insert(gone).await;
    drop(gone_rx);

    assert!(registry.sweep().await.is_empty());
    registry.remove("gone").await;
    assert!(registry.sweep().await.is_empty());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_emit_reports_delivery_per_target() {
    let registry = ClientRegistry::new();
    let (a, mut a_rx) = client("a");
    let (b, b_rx) = client("b");
    registry.insert(a).await;
    registry.insert(b).await;
    drop(b_rx);

    let delivered = registry.emit(&["a", "b", "nobody"], "tick", vec![json!(5)]).await;
    assert_eq!(delivered, vec![true, false, false]);

    match a_rx.recv().await {
        Some(OutboundFrame::Text(text)) => {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value, json!({"jsonrpc": "2.0", "method": "tick", "params": [5]}));
        }
        other => panic!("unexpected frame {other:?}"),
    }

    assert!(!registry.emit_to("nobody", "tick", vec![]).await);
    let mut all = registry.emit_all("tock", vec![]).await;
    all.sort();
    assert_eq!(all, vec![false, true]);
}

#[tokio::test]
async fn test_registry_lookup() {
    let registry = ClientRegistry::new();
    let (a, _a_rx) = client("a");
    registry.insert(a).await;

    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.ids().await, vec!["a".to_string()]);
    assert_eq!(registry.get("a").await.map(|c| c.id().to_string()), Some("a".into()));
    assert!(registry.get("b").await.is_none());
    assert!(registry.remove("a").await.is_some());
    assert!(registry.remove("a").await.is_none());
}
