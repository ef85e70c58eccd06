use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Protocol-level error codes.
///
/// These codes are reserved for protocol failures and must not be reused by
/// application handlers for their own errors.
#[repr(i64)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum RpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

impl RpcErrorCode {
    /// The canonical message sent alongside the code.
    pub fn message(self) -> &'static str {
        match self {
            RpcErrorCode::ParseError => "Parse error",
            RpcErrorCode::InvalidRequest => "Invalid Request",
            RpcErrorCode::MethodNotFound => "Method not found",
            RpcErrorCode::InvalidParams => "Invalid params",
            RpcErrorCode::InternalError => "Internal error",
        }
    }

    pub fn code(self) -> i64 {
        self.into()
    }

    /// Whether `code` belongs to the reserved protocol vocabulary.
    pub fn is_reserved(code: i64) -> bool {
        RpcErrorCode::try_from(code).is_ok()
    }
}
