use super::{DecodeError, EncodeError};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Which kind of WebSocket frame an encoder's output travels in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// A named, stateless transform between a transmitted unit and bytes.
///
/// `encode` receives the wire value of a single message or of a batch
/// (an array of messages). `decode` returns the same shape; validation of the
/// individual messages happens afterwards, so a decoder only has to be
/// faithful, not strict.
///
/// Implementations are registered once at startup and shared read-only
/// across every connection.
pub trait RpcEncoder: Send + Sync + Debug {
    /// Name advertised in the `rpc.<name>` subprotocol token.
    fn name(&self) -> &str;

    fn frame_kind(&self) -> FrameKind {
        FrameKind::Binary
    }

    fn encode(&self, packet: &Value) -> Result<Vec<u8>, EncodeError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError>;
}

pub type SharedEncoder = Arc<dyn RpcEncoder>;
