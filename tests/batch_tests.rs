use serde_json::{Value, json};
use wsrpc::{RpcMessage, RpcPacket};

#[test]
fn test_split_single_and_batch() {
    let single = RpcPacket::split(json!({"jsonrpc": "2.0", "method": "a"}), 4).unwrap();
    assert!(!single.is_batch());
    assert_eq!(single.len(), 1);

    let batch = RpcPacket::split(json!([{}, {}, {}]), 4).unwrap();
    assert!(batch.is_batch());
    assert_eq!(batch.into_items().len(), 3);
}

#[test]
fn test_split_rejects_oversized_batch_wholesale() {
    let items: Vec<Value> = (0..5).map(|i| json!({"jsonrpc": "2.0", "id": i, "method": "m"})).collect();
    let err = RpcPacket::split(Value::Array(items), 4).unwrap_err();
    assert_eq!(err.code, -32600);
    assert_eq!(err.data, Some(json!("batch is too large size=4")));
}

#[test]
fn test_batch_at_limit_is_accepted() {
    let items: Vec<Value> = (0..4).map(|_| json!({})).collect();
    assert!(RpcPacket::split(Value::Array(items), 4).is_ok());
}

#[test]
fn test_from_items_mirrors_input_shape() {
    assert_eq!(RpcPacket::<u8>::from_items(true, vec![]), None);
    assert_eq!(RpcPacket::from_items(false, vec![1]), Some(RpcPacket::Single(1)));
    assert_eq!(RpcPacket::from_items(true, vec![1]), Some(RpcPacket::Batch(vec![1])));
}

#[test]
fn test_message_packet_to_value() {
    let packet = RpcPacket::Batch(vec![
        RpcMessage::event("a", vec![]),
        RpcMessage::event("b", vec![json!(1)]),
    ]);
    let value: Value = packet.into();
    assert_eq!(
        value,
        json!([
            {"jsonrpc": "2.0", "method": "a"},
            {"jsonrpc": "2.0", "method": "b", "params": [1]}
        ])
    );
}
