use crate::constants::{DEFAULT_CALL_TIMEOUT, DEFAULT_RECONNECT_WAIT_MAX, DEFAULT_RECONNECT_WAIT_MIN};
use std::time::Duration;
use wsrpc::SharedEncoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// First delay after a lost connection. Doubles on each failed attempt.
    pub wait_min: Duration,
    /// Upper bound for the doubling delay.
    pub wait_max: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wait_min: DEFAULT_RECONNECT_WAIT_MIN,
            wait_max: DEFAULT_RECONNECT_WAIT_MAX,
        }
    }
}

impl ReconnectConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Client settings.
///
/// `encoders` are offered to the server in the given order, followed by JSON.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub timeout: Duration,
    pub reconnect: ReconnectConfig,
    pub encoders: Vec<SharedEncoder>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
            reconnect: ReconnectConfig::default(),
            encoders: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_encoder(mut self, encoder: SharedEncoder) -> Self {
        self.encoders.push(encoder);
        self
    }
}
