use super::RpcErrorCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reads an error code. Whole-number floats such as `7.0` count as integers.
pub fn integer_code(value: &Value) -> Option<i64> {
    if let Some(code) = value.as_i64() {
        return Some(code);
    }
    let code = value.as_f64()?;
    // i64::MIN and 2^63 are both exact as f64.
    let in_range = code >= i64::MIN as f64 && code < -(i64::MIN as f64);
    (code.fract() == 0.0 && in_range).then_some(code as i64)
}

/// The `error` object of an error message.
///
/// Also usable as a Rust error: a server handler can return it through `?`
/// and the dispatcher forwards its code, message and data unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Builds an error from the reserved vocabulary with its canonical message.
    pub fn from_code(code: RpcErrorCode, data: Option<Value>) -> Self {
        Self::new(code.code(), code.message(), data)
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::from_code(RpcErrorCode::ParseError, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::from_code(RpcErrorCode::InvalidRequest, data)
    }

    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::from_code(RpcErrorCode::MethodNotFound, data)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::from_code(RpcErrorCode::InvalidParams, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::from_code(RpcErrorCode::InternalError, data)
    }

    /// Shorthand for attaching a plain diagnostic string as `data`.
    pub fn with_note(self, note: impl Into<String>) -> Self {
        Self {
            data: Some(Value::String(note.into())),
            ..self
        }
    }

    /// Returns the reserved code this error carries, if any.
    pub fn reserved_code(&self) -> Option<RpcErrorCode> {
        RpcErrorCode::try_from(self.code).ok()
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("code".into(), Value::from(self.code));
        object.insert("message".into(), Value::String(self.message.clone()));
        if let Some(data) = &self.data {
            object.insert("data".into(), data.clone());
        }
        Value::Object(object)
    }
}
