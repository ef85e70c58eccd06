use std::time::Duration;

/// How often the liveness sweep pings every connection.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(3000);

/// Route the WebSocket endpoint is mounted on.
pub const WS_ROUTE: &str = "/ws";

/// Length of generated client ids.
pub const CLIENT_ID_LENGTH: usize = 21;

/// How long a closing connection may take to write out its queued frames.
pub const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_millis(1000);
