use serde_json::{Number, Value};
use std::fmt;

/// Correlation id carried by requests, responses and error messages.
///
/// The wire only admits strings, numbers and `null`; anything else is
/// rejected during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcId {
    Number(Number),
    String(String),
    Null,
}

impl RpcId {
    /// Converts a wire value into an id, returning `None` for objects, arrays
    /// and booleans.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(RpcId::Number(n.clone())),
            Value::String(s) => Some(RpcId::String(s.clone())),
            Value::Null => Some(RpcId::Null),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RpcId::Number(n) => Value::Number(n.clone()),
            RpcId::String(s) => Value::String(s.clone()),
            RpcId::Null => Value::Null,
        }
    }

    /// Returns the id as an unsigned integer when it is one.
    ///
    /// Ids allocated by the client are always unsigned integers, so this is
    /// the lookup key for pending calls.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RpcId::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RpcId::Null)
    }
}

impl From<u64> for RpcId {
    fn from(id: u64) -> Self {
        RpcId::Number(Number::from(id))
    }
}

impl From<&str> for RpcId {
    fn from(id: &str) -> Self {
        RpcId::String(id.to_string())
    }
}

impl From<String> for RpcId {
    fn from(id: String) -> Self {
        RpcId::String(id)
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{n}"),
            RpcId::String(s) => write!(f, "{s}"),
            RpcId::Null => write!(f, "null"),
        }
    }
}
