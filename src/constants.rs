/// The only protocol version accepted on the wire.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Namespace prefix for subprotocol tokens (`rpc.<encoder-name>`) and for
/// reserved event names.
pub const RPC_PREFIX: &str = "rpc.";

/// Maximum number of messages accepted in a single batch.
pub const DEFAULT_MAX_BATCH: usize = 128;

/// WebSocket close code for a normal, intentional closure.
///
/// A connection closed with this code is never re-established by the client.
pub const CLOSE_CODE_NORMAL: u16 = 1000;
