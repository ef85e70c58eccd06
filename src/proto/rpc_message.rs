use super::{RpcError, RpcId, RpcMessageType};
use crate::constants::PROTOCOL_VERSION;
use serde_json::{Map, Value};

/// A single protocol message.
///
/// Every variant is implicitly tagged with the protocol version; the tag is
/// added when the message is turned into its wire value and checked when a
/// wire value is parsed back.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    /// A call expecting exactly one response or error.
    Request {
        id: RpcId,
        method: String,
        args: Vec<Value>,
    },
    /// Fire-and-forget notification. Never answered.
    Event { method: String, args: Vec<Value> },
    /// Successful answer to a request. `result` may be `null`.
    Response { id: RpcId, result: Value },
    /// Failed answer to a request, or a protocol failure with a `null` id.
    Error { id: RpcId, error: RpcError },
}

impl RpcMessage {
    pub fn request(id: impl Into<RpcId>, method: impl Into<String>, args: Vec<Value>) -> Self {
        RpcMessage::Request {
            id: id.into(),
            method: method.into(),
            args,
        }
    }

    pub fn event(method: impl Into<String>, args: Vec<Value>) -> Self {
        RpcMessage::Event {
            method: method.into(),
            args,
        }
    }

    pub fn response(id: RpcId, result: Value) -> Self {
        RpcMessage::Response { id, result }
    }

    pub fn error(id: RpcId, error: RpcError) -> Self {
        RpcMessage::Error { id, error }
    }

    pub fn message_type(&self) -> RpcMessageType {
        match self {
            RpcMessage::Request { .. } => RpcMessageType::Request,
            RpcMessage::Event { .. } => RpcMessageType::Event,
            RpcMessage::Response { .. } => RpcMessageType::Response,
            RpcMessage::Error { .. } => RpcMessageType::Error,
        }
    }

    pub fn id(&self) -> Option<&RpcId> {
        match self {
            RpcMessage::Request { id, .. }
            | RpcMessage::Response { id, .. }
            | RpcMessage::Error { id, .. } => Some(id),
            RpcMessage::Event { .. } => None,
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            RpcMessage::Request { method, .. } | RpcMessage::Event { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Builds the wire shape of this message.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("jsonrpc".into(), Value::String(PROTOCOL_VERSION.into()));

        match self {
            RpcMessage::Request { id, method, args } => {
                object.insert("id".into(), id.to_value());
                object.insert("method".into(), Value::String(method.clone()));
                if let Some(params) = params_from_args(args.clone()) {
                    object.insert("params".into(), params);
                }
            }
            RpcMessage::Event { method, args } => {
                object.insert("method".into(), Value::String(method.clone()));
                if let Some(params) = params_from_args(args.clone()) {
                    object.insert("params".into(), params);
                }
            }
            RpcMessage::Response { id, result } => {
                object.insert("id".into(), id.to_value());
                object.insert("result".into(), result.clone());
            }
            RpcMessage::Error { id, error } => {
                object.insert("id".into(), id.to_value());
                object.insert("error".into(), error.to_value());
            }
        }

        Value::Object(object)
    }
}

impl From<RpcMessage> for Value {
    fn from(message: RpcMessage) -> Self {
        message.to_value()
    }
}

/// Converts a call's argument list into its `params` wire form.
///
/// No arguments omit `params`. A single keyed object is passed through as a
/// named parameter bag. Everything else becomes a positional array.
pub fn params_from_args(args: Vec<Value>) -> Option<Value> {
    match args.len() {
        0 => None,
        1 if args[0].is_object() => args.into_iter().next(),
        _ => Some(Value::Array(args)),
    }
}

/// Inverse of [`params_from_args`]: normalizes `params` into an argument list.
pub fn args_from_params(params: Option<Value>) -> Vec<Value> {
    match params {
        None => Vec::new(),
        Some(Value::Array(args)) => args,
        Some(bag) => vec![bag],
    }
}
