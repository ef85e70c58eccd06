use super::{RpcError, RpcErrorCode, RpcId, RpcMessage, args_from_params, integer_code};
use crate::constants::PROTOCOL_VERSION;
use serde_json::Value;
use thiserror::Error;

/// The specific rule a wire value broke.
///
/// The `Display` text of each reason is sent as the `data` of the resulting
/// error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseErrorKind {
    #[error("invalid message type '{0}'")]
    InvalidMessageType(&'static str),

    #[error("only {} protocol supported", PROTOCOL_VERSION)]
    UnsupportedProtocol,

    #[error("invalid id type '{0}'")]
    InvalidId(&'static str),

    #[error("message has both error and result")]
    HasErrorAndResult,

    #[error("error is not object")]
    ErrorIsNotObject,

    #[error("error code is not integer")]
    ErrorCodeIsNotInteger,

    #[error("error message is not string")]
    ErrorMessageIsNotString,

    #[error("at least one of method, result or error field must be set")]
    NoMethodResultError,

    #[error("method must be string")]
    MethodMustBeString,

    #[error("params must be an array or an object")]
    InvalidParams,
}

impl MessageParseErrorKind {
    pub fn code(&self) -> RpcErrorCode {
        use MessageParseErrorKind::*;

        match self {
            HasErrorAndResult | ErrorIsNotObject | ErrorCodeIsNotInteger
            | ErrorMessageIsNotString => RpcErrorCode::ParseError,
            InvalidParams => RpcErrorCode::InvalidParams,
            InvalidMessageType(_) | UnsupportedProtocol | InvalidId(_) | NoMethodResultError
            | MethodMustBeString => RpcErrorCode::InvalidRequest,
        }
    }
}

/// A wire value that failed validation, tagged with whatever id could be
/// recovered from it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (id={id})")]
pub struct MessageParseError {
    pub id: RpcId,
    pub kind: MessageParseErrorKind,
}

impl MessageParseError {
    pub fn new(id: RpcId, kind: MessageParseErrorKind) -> Self {
        Self { id, kind }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::from_code(self.kind.code(), None).with_note(self.kind.to_string())
    }

    /// The error message answering the offending value.
    pub fn into_message(self) -> RpcMessage {
        let error = self.to_rpc_error();
        RpcMessage::error(self.id, error)
    }
}

/// Validates and classifies a single decoded wire value.
///
/// Rules are checked in a fixed order and the first violation wins, so the
/// same malformed input always yields the same error code.
pub fn parse_message(raw: &Value) -> Result<RpcMessage, MessageParseError> {
    use MessageParseErrorKind::*;

    let Some(object) = raw.as_object() else {
        return Err(MessageParseError::new(
            RpcId::Null,
            InvalidMessageType(value_kind(raw)),
        ));
    };

    let raw_id = object.get("id");

    if object.get("jsonrpc").and_then(Value::as_str) != Some(PROTOCOL_VERSION) {
        let id = raw_id.and_then(RpcId::from_value).unwrap_or(RpcId::Null);
        return Err(MessageParseError::new(id, UnsupportedProtocol));
    }

    let id = match raw_id {
        None => None,
        Some(value) => match RpcId::from_value(value) {
            Some(id) => Some(id),
            None => return Err(MessageParseError::new(RpcId::Null, InvalidId(value_kind(value)))),
        },
    };
    let reply_id = id.clone().unwrap_or(RpcId::Null);
    let fail = |kind| Err(MessageParseError::new(reply_id.clone(), kind));

    if let Some(result) = object.get("result") {
        if object.contains_key("error") {
            return fail(HasErrorAndResult);
        }
        return Ok(RpcMessage::response(reply_id.clone(), result.clone()));
    }

    if let Some(error) = object.get("error") {
        let Some(error) = error.as_object() else {
            return fail(ErrorIsNotObject);
        };
        let Some(code) = error.get("code").and_then(integer_code) else {
            return fail(ErrorCodeIsNotInteger);
        };
        let Some(message) = error.get("message").and_then(Value::as_str) else {
            return fail(ErrorMessageIsNotString);
        };
        let error = RpcError::new(code, message, error.get("data").cloned());
        return Ok(RpcMessage::error(reply_id.clone(), error));
    }

    let method = match object.get("method") {
        None => return fail(NoMethodResultError),
        Some(Value::String(method)) => method.clone(),
        Some(_) => return fail(MethodMustBeString),
    };

    let params = match object.get("params") {
        None => None,
        Some(params) if params.is_array() || params.is_object() => Some(params.clone()),
        Some(_) => return fail(InvalidParams),
    };
    let args = args_from_params(params);

    Ok(match id {
        Some(id) => RpcMessage::Request { id, method, args },
        None => RpcMessage::Event { method, args },
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
