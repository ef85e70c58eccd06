use serde_json::json;
use wsrpc::{RpcError, RpcId, RpcMessage, args_from_params, params_from_args, parse_message};

#[test]
fn test_request_without_args_omits_params() {
    let value = RpcMessage::request(1u64, "ping", vec![]).to_value();
    assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
}

#[test]
fn test_single_keyed_arg_is_passed_unwrapped() {
    let value = RpcMessage::event("login", vec![json!({"user": "a"})]).to_value();
    assert_eq!(value, json!({"jsonrpc": "2.0", "method": "login", "params": {"user": "a"}}));
}

#[test]
fn test_single_array_or_scalar_arg_stays_positional() {
    assert_eq!(params_from_args(vec![json!(42)]), Some(json!([42])));
    assert_eq!(params_from_args(vec![json!([1, 2])]), Some(json!([[1, 2]])));
    assert_eq!(args_from_params(Some(json!([[1, 2]]))), vec![json!([1, 2])]);
}

#[test]
fn test_messages_survive_wire_conversion() {
    let messages = [
        RpcMessage::request(7u64, "echo", vec![json!(42)]),
        RpcMessage::request(RpcId::from("s"), "named", vec![json!({"k": [1, 2.5, null]})]),
        RpcMessage::event("tick", vec![json!(5), json!("x")]),
        RpcMessage::response(RpcId::from(7u64), json!(null)),
        RpcMessage::error(RpcId::Null, RpcError::method_not_found(Some(json!("missing")))),
        RpcMessage::error(RpcId::from(2u64), RpcError::new(7, "denied", None)),
    ];

    for message in messages {
        assert_eq!(parse_message(&message.to_value()).unwrap(), message);
    }
}
