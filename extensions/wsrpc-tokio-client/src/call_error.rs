use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use wsrpc::{EncodeError, RpcError, RpcId};

/// Why a call (or an outgoing event) did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcCallError {
    /// The server answered with an error message.
    #[error("'{method}' (id {id}) failed: [{code}] {message}")]
    Remote {
        id: RpcId,
        method: String,
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("'{method}' (id {id}) timed out after {timeout:?}")]
    Timeout {
        id: RpcId,
        method: String,
        timeout: Duration,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("connection is closed")]
    Closed,

    #[error("unexpected result for '{method}': {reason}")]
    InvalidResult { method: String, reason: String },
}

impl RpcCallError {
    pub(crate) fn remote(id: RpcId, method: impl Into<String>, error: RpcError) -> Self {
        RpcCallError::Remote {
            id,
            method: method.into(),
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// The error code sent by the server, for [`RpcCallError::Remote`].
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcCallError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcCallError::Timeout { .. })
    }
}
