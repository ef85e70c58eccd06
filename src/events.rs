mod event_emitter;

pub use event_emitter::{EventEmitter, Subscription};

/// Raised on the client after the transport opened and an encoder was chosen.
pub const CONNECTED: &str = "rpc.connected";

/// Raised on the client when an open connection is lost or closed.
pub const DISCONNECTED: &str = "rpc.disconnected";

/// Raised on the client for every decoded inbound unit, before dispatch.
pub const MESSAGE: &str = "rpc.message";

/// Raised on the client for failures not tied to a specific call.
pub const ERROR: &str = "rpc.error";

/// Event pushed by the server to a freshly accepted client, carrying the
/// client's own id as its only argument.
pub const CLIENT_CONNECTED: &str = "rpc.client_connected";
