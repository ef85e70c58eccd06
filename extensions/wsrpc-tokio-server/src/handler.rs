use crate::context::Context;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use wsrpc::{RpcError, integer_code};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<Answer, BoxError>;

/// Request handler: receives the context, the method name and the
/// positional arguments.
pub type RpcHandler<C> =
    Arc<dyn Fn(Context<C>, String, Vec<Value>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Event handler. Its failures are logged and dropped.
pub type EventHandler<C> = Arc<
    dyn Fn(Context<C>, String, Vec<Value>) -> BoxFuture<'static, Result<(), BoxError>>
        + Send
        + Sync,
>;

/// What a request handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Sent back as the `result` of a response.
    Value(Value),
    /// No reply at all is sent for the request.
    Suppressed,
}

impl Answer {
    pub fn null() -> Self {
        Answer::Value(Value::Null)
    }
}

impl From<Value> for Answer {
    fn from(value: Value) -> Self {
        Answer::Value(value)
    }
}

impl From<Option<Value>> for Answer {
    fn from(value: Option<Value>) -> Self {
        Answer::Value(value.unwrap_or(Value::Null))
    }
}

impl From<()> for Answer {
    fn from(_: ()) -> Self {
        Answer::null()
    }
}

/// An error raised with a dynamically shaped `code`.
///
/// [`RpcError`] covers the common case of an integer code. `ThrownError` is
/// for errors built from untrusted values, where `code` may turn out to be
/// missing or not an integer.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ThrownError {
    pub code: Value,
    pub message: String,
    pub data: Option<Value>,
}

impl ThrownError {
    pub fn new(code: impl Into<Value>, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data,
        }
    }

    /// Reads `code`, `message` and `data` from an object. Anything else becomes
    /// a code-less error whose message is the value's text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(object) => Self {
                code: object.get("code").cloned().unwrap_or(Value::Null),
                message: match object.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
                data: object.get("data").cloned(),
            },
            Value::String(message) => Self::new(Value::Null, message.clone(), None),
            other => Self::new(Value::Null, other.to_string(), None),
        }
    }

    /// Maps to the error object sent on the wire.
    pub fn to_rpc_error(&self) -> RpcError {
        match &self.code {
            Value::Null => RpcError::internal_error(None),
            code => match integer_code(code) {
                Some(code) => RpcError::new(code, self.message.clone(), self.data.clone()),
                None => RpcError::internal_error(None)
                    .with_note(format!("server throws error with non-integer code {code}")),
            },
        }
    }
}
