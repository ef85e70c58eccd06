//! Handlers for the demo service: a few arithmetic methods and a chat room
//! built on server-pushed events.

use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use wsrpc::RpcError;
use wsrpc_tokio_server::{BoxError, Context, HandlerResult};

/// Name of the event clients send and receive chat lines on.
pub const CHAT_EVENT: &str = "chat";

#[derive(Debug, Default)]
pub struct AppState {
    calls: AtomicU64,
}

impl AppState {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

fn numbers(args: &[Value]) -> Result<Vec<f64>, RpcError> {
    args.iter()
        .map(|arg| {
            arg.as_f64().ok_or_else(|| {
                RpcError::invalid_params(None).with_note(format!("expected a number, got {arg}"))
            })
        })
        .collect()
}

pub async fn handle_rpc(ctx: Context<AppState>, method: String, args: Vec<Value>) -> HandlerResult {
    ctx.global().calls.fetch_add(1, Ordering::Relaxed);

    match method.as_str() {
        "add" => Ok(json!(numbers(&args)?.iter().sum::<f64>()).into()),
        "mult" => Ok(json!(numbers(&args)?.iter().product::<f64>()).into()),
        "echo" => Ok(args.into_iter().next().unwrap_or(Value::Null).into()),
        "calls" => Ok(json!(ctx.global().calls()).into()),
        "divide" => {
            let operands = numbers(&args)?;
            let &[dividend, divisor] = operands.as_slice() else {
                return ctx.throw(-32602, "Invalid params", Some(json!("expected two numbers")));
            };
            if divisor == 0.0 {
                return ctx.throw(1, "division by zero", None);
            }
            Ok(json!(dividend / divisor).into())
        }
        _ => ctx.throw_method_not_found(),
    }
}

/// Rebroadcasts chat lines to every connected client, tagged with the
/// sender's id.
pub async fn handle_event(ctx: Context<AppState>, method: String, args: Vec<Value>) -> Result<(), BoxError> {
    if method != CHAT_EVENT {
        tracing::debug!("Ignoring event '{}' from {}", method, ctx.client_id());
        return Ok(());
    }
    let line = args.into_iter().next().unwrap_or(Value::Null);
    let delivered = ctx
        .emit_all(CHAT_EVENT, vec![json!(ctx.client_id()), line])
        .await;
    tracing::debug!("Chat line relayed to {} client(s)", delivered.iter().filter(|ok| **ok).count());
    Ok(())
}
