use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use wsrpc::{DecodeError, EncodeError, RpcEncoder, RpcError, SharedEncoder, json_encoder};
use wsrpc_encoder_bitcode::BitcodeEncoder;
use wsrpc_tokio_server::{
    Answer, BoxError, ClientHandle, ClientRegistry, Context, DispatchScope, HandlerResult,
    OutboundFrame, RpcDispatcher, ThrownError,
};

fn scope_with(encoder: SharedEncoder) -> (DispatchScope<()>, mpsc::UnboundedReceiver<OutboundFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let scope = DispatchScope {
        client: ClientHandle::new("client-a", encoder, tx),
        clients: ClientRegistry::new(),
        global: Arc::new(()),
    };
    (scope, rx)
}

fn json_scope() -> (DispatchScope<()>, mpsc::UnboundedReceiver<OutboundFrame>) {
    scope_with(json_encoder())
}

fn text_of(frame: OutboundFrame) -> Value {
    match frame {
        OutboundFrame::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn echo(_ctx: Context<()>, method: String, args: Vec<Value>) -> HandlerResult {
    match method.as_str() {
        "echo" => Ok(args.into_iter().next().unwrap_or(Value::Null).into()),
        "nothing" => Ok(().into()),
        "drop" => Ok(Answer::Suppressed),
        "denied" => Err(Box::new(RpcError::new(7, "denied", Some(json!({"why": "nope"}))))),
        "weird" => Err(Box::new(ThrownError::new("E_WEIRD", "weird", None))),
        "float" => Err(Box::new(ThrownError::from_value(&json!({"code": 7.0, "message": "denied"})))),
        "io" => Err(Box::new(std::io::Error::other("disk on fire"))),
        "panic" => panic!("handler blew up"),
        _ => Err(Box::new(RpcError::method_not_found(Some(Value::String(method))))),
    }
}

async fn thrower(ctx: Context<()>, _method: String, _args: Vec<Value>) -> HandlerResult {
    ctx.throw(7, "denied", Some(json!("by policy")))
}

async fn not_found(ctx: Context<()>, _method: String, _args: Vec<Value>) -> HandlerResult {
    ctx.throw_method_not_found()
}

async fn failing_event(_ctx: Context<()>, method: String, _args: Vec<Value>) -> Result<(), BoxError> {
    if method == "panic" {
        panic!("event handler blew up");
    }
    Err("event handler failed".into())
}

fn echo_dispatcher() -> RpcDispatcher<()> {
    let mut dispatcher = RpcDispatcher::new(4);
    dispatcher.set_rpc_handler(echo);
    dispatcher
}

#[tokio::test]
async fn test_request_is_answered_with_handler_result() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher()
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 1, "method": "echo", "params": [42]}))
        .await
        .unwrap();
    assert_eq!(reply.packet, json!({"jsonrpc": "2.0", "id": 1, "result": 42}));
    assert!(!reply.json_fallback);
}

#[tokio::test]
async fn test_absent_return_value_becomes_null_result() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher()
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": "n", "method": "nothing"}))
        .await
        .unwrap();
    assert_eq!(reply.packet, json!({"jsonrpc": "2.0", "id": "n", "result": null}));
}

#[tokio::test]
async fn test_missing_rpc_handler_yields_method_not_found() {
    let (scope, _rx) = json_scope();
    let dispatcher = RpcDispatcher::<()>::new(4);
    let reply = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 2, "method": "missing"}))
        .await
        .unwrap();
    assert_eq!(reply.packet["error"]["code"], json!(-32601));
    assert_eq!(reply.packet["error"]["data"], json!("missing"));
    assert_eq!(reply.packet["id"], json!(2));
}

#[tokio::test]
async fn test_handler_errors_map_to_error_messages() {
    let (scope, _rx) = json_scope();
    let dispatcher = echo_dispatcher();

    let denied = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 1, "method": "denied"}))
        .await
        .unwrap();
    assert_eq!(
        denied.packet["error"],
        json!({"code": 7, "message": "denied", "data": {"why": "nope"}})
    );

    let weird = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 2, "method": "weird"}))
        .await
        .unwrap();
    assert_eq!(weird.packet["error"]["code"], json!(-32603));
    assert_eq!(
        weird.packet["error"]["data"],
        json!("server throws error with non-integer code \"E_WEIRD\"")
    );

    let io = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 3, "method": "io"}))
        .await
        .unwrap();
    assert_eq!(io.packet["error"], json!({"code": -32603, "message": "Internal error"}));

    let float = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 4, "method": "float"}))
        .await
        .unwrap();
    assert_eq!(float.packet["error"], json!({"code": 7, "message": "denied"}));
}

#[tokio::test]
async fn test_handler_panic_is_reported_as_internal_error() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher()
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 9, "method": "panic"}))
        .await
        .unwrap();
    assert_eq!(reply.packet["error"]["code"], json!(-32603));
    assert_eq!(reply.packet["id"], json!(9));
}

#[tokio::test]
async fn test_context_throw_helpers() {
    let (scope, _rx) = json_scope();

    let mut dispatcher = RpcDispatcher::new(4);
    dispatcher.set_rpc_handler(thrower);
    let reply = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 1, "method": "secret"}))
        .await
        .unwrap();
    assert_eq!(
        reply.packet["error"],
        json!({"code": 7, "message": "denied", "data": "by policy"})
    );

    let mut dispatcher = RpcDispatcher::new(4);
    dispatcher.set_rpc_handler(not_found);
    let reply = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 2, "method": "whatever"}))
        .await
        .unwrap();
    assert_eq!(reply.packet["error"]["code"], json!(-32601));
    assert_eq!(reply.packet["error"]["data"], json!("whatever"));
}

#[tokio::test]
async fn test_suppressed_answer_sends_nothing() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher()
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 1, "method": "drop"}))
        .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_event_failures_are_swallowed() {
    let (scope, _rx) = json_scope();
    let mut dispatcher = echo_dispatcher();
    dispatcher.set_event_handler(failing_event);

    for method in ["fails", "panic"] {
        let reply = dispatcher
            .handle_value(&scope, json!({"jsonrpc": "2.0", "method": method, "params": [1]}))
            .await;
        assert!(reply.is_none());
    }
}

#[tokio::test]
async fn test_batch_reply_mirrors_shape_and_skips_events() {
    let (scope, _rx) = json_scope();
    let dispatcher = echo_dispatcher();

    let reply = dispatcher
        .handle_value(
            &scope,
            json!([
                {"jsonrpc": "2.0", "id": 1, "method": "echo", "params": ["a"]},
                {"jsonrpc": "2.0", "method": "tick"},
                {"jsonrpc": "2.0", "id": 2, "method": "echo", "params": ["b"]},
            ]),
        )
        .await
        .unwrap();
    assert_eq!(
        reply.packet,
        json!([
            {"jsonrpc": "2.0", "id": 1, "result": "a"},
            {"jsonrpc": "2.0", "id": 2, "result": "b"},
        ])
    );

    let single_item_batch = dispatcher
        .handle_value(&scope, json!([{"jsonrpc": "2.0", "id": 3, "method": "echo", "params": [3]}]))
        .await
        .unwrap();
    assert!(single_item_batch.packet.is_array());

    let events_only = dispatcher
        .handle_value(&scope, json!([{"jsonrpc": "2.0", "method": "tick"}]))
        .await;
    assert!(events_only.is_none());

    assert!(dispatcher.handle_value(&scope, json!([])).await.is_none());
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_before_dispatch() {
    let (scope, _rx) = json_scope();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut dispatcher = RpcDispatcher::new(2);
    dispatcher.set_rpc_handler({
        let calls = calls.clone();
        move |_ctx: Context<()>, _method: String, _args: Vec<Value>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Answer, BoxError>(Answer::null())
            }
        }
    });

    let batch: Vec<Value> = (0..3)
        .map(|id| json!({"jsonrpc": "2.0", "id": id, "method": "count"}))
        .collect();
    let reply = dispatcher.handle_value(&scope, Value::Array(batch)).await.unwrap();

    assert_eq!(reply.packet["error"]["code"], json!(-32600));
    assert_eq!(reply.packet["error"]["data"], json!("batch is too large size=2"));
    assert_eq!(reply.packet["id"], Value::Null);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_client_must_not_send_responses_or_errors() {
    let (scope, _rx) = json_scope();
    let dispatcher = echo_dispatcher();

    let reply = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 5, "result": 1}))
        .await
        .unwrap();
    assert_eq!(reply.packet["error"]["code"], json!(-32600));
    assert_eq!(
        reply.packet["error"]["data"],
        json!("client must not send response message to server")
    );
    assert_eq!(reply.packet["id"], json!(5));

    let reply = dispatcher
        .handle_value(
            &scope,
            json!({"jsonrpc": "2.0", "id": 6, "error": {"code": 1, "message": "x"}}),
        )
        .await
        .unwrap();
    assert_eq!(
        reply.packet["error"]["data"],
        json!("client must not send error message to server")
    );
}

#[tokio::test]
async fn test_invalid_items_are_answered_individually() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher()
        .handle_value(
            &scope,
            json!([
                {"jsonrpc": "1.0", "id": 1, "method": "echo"},
                {"jsonrpc": "2.0", "id": 2, "method": "echo", "params": ["ok"]},
            ]),
        )
        .await
        .unwrap();
    assert_eq!(reply.packet[0]["error"]["code"], json!(-32600));
    assert_eq!(reply.packet[0]["id"], json!(1));
    assert_eq!(reply.packet[1]["result"], json!("ok"));
}

#[tokio::test]
async fn test_scalar_payload_is_an_invalid_message() {
    let (scope, _rx) = json_scope();
    let reply = echo_dispatcher().handle_value(&scope, json!(5)).await.unwrap();
    assert_eq!(reply.packet["error"]["code"], json!(-32700));
    assert_eq!(reply.packet["error"]["data"], json!("invalid message"));
}

#[tokio::test]
async fn test_undecodable_frame_falls_back_to_json() {
    let (scope, mut rx) = scope_with(Arc::new(BitcodeEncoder));
    let reply = echo_dispatcher()
        .handle_frame(&scope, &[])
        .await
        .unwrap();

    assert!(reply.json_fallback);
    assert_eq!(reply.packet["error"]["code"], json!(-32700));
    let data = reply.packet["error"]["data"].as_str().unwrap();
    assert!(data.starts_with("decoding failed"), "{data}");

    assert!(reply.deliver(&scope.client));
    let sent = text_of(rx.recv().await.unwrap());
    assert_eq!(sent["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn test_overly_nested_binary_frame_is_a_parse_error() {
    let (scope, _rx) = scope_with(Arc::new(BitcodeEncoder));
    let mut params = json!(null);
    for _ in 0..200 {
        params = json!([params]);
    }
    let bytes = BitcodeEncoder
        .encode(&json!({"jsonrpc": "2.0", "id": 1, "method": "echo", "params": params}))
        .unwrap();

    let reply = echo_dispatcher().handle_frame(&scope, &bytes).await.unwrap();
    assert!(reply.json_fallback);
    assert_eq!(reply.packet["id"], Value::Null);
    assert_eq!(reply.packet["error"]["code"], json!(-32700));
}

#[derive(Debug)]
struct BrokenEncoder;

impl RpcEncoder for BrokenEncoder {
    fn name(&self) -> &str {
        "broken"
    }

    fn encode(&self, _packet: &Value) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::new("broken", "cannot encode anything"))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        serde_json::from_slice(bytes).map_err(|err| DecodeError::new("broken", err))
    }
}

#[tokio::test]
async fn test_encode_failure_reports_with_json() {
    let (scope, mut rx) = scope_with(Arc::new(BrokenEncoder));
    let reply = echo_dispatcher()
        .handle_frame(&scope, br#"{"jsonrpc":"2.0","id":1,"method":"echo","params":[1]}"#)
        .await
        .unwrap();

    assert!(!reply.deliver(&scope.client));
    let sent = text_of(rx.recv().await.unwrap());
    assert_eq!(
        sent,
        json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32603, "message": "Internal error", "data": "encoding failed"}})
    );
}

#[tokio::test]
async fn test_context_emits_to_other_clients() {
    let (scope, _rx) = json_scope();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    scope
        .clients
        .insert(ClientHandle::new("client-b", json_encoder(), tx_b))
        .await;

    let mut dispatcher = RpcDispatcher::new(4);
    dispatcher.set_rpc_handler(|ctx: Context<()>, _method: String, args: Vec<Value>| async move {
        let delivered = ctx.emit_to(&["client-b", "client-gone"], "tick", args).await;
        Ok::<Answer, BoxError>(json!(delivered).into())
    });

    let reply = dispatcher
        .handle_value(&scope, json!({"jsonrpc": "2.0", "id": 1, "method": "notify", "params": [5]}))
        .await
        .unwrap();
    assert_eq!(reply.packet["result"], json!([true, false]));

    let pushed = text_of(rx_b.recv().await.unwrap());
    assert_eq!(pushed, json!({"jsonrpc": "2.0", "method": "tick", "params": [5]}));
}
