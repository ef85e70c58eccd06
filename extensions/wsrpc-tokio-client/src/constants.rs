use std::time::Duration;

/// How long a call waits for its answer, including the wait for a usable
/// connection.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(5000);

pub const DEFAULT_RECONNECT_WAIT_MIN: Duration = Duration::from_millis(125);

pub const DEFAULT_RECONNECT_WAIT_MAX: Duration = Duration::from_millis(8000);

/// How long an explicit close waits for the server to acknowledge.
pub const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1000);
