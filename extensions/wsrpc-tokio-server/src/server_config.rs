use crate::constants::DEFAULT_PING_INTERVAL;
use std::time::Duration;
use wsrpc::{SharedEncoder, constants::DEFAULT_MAX_BATCH};

/// Server tuning knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interval of the liveness sweep. A connection is evicted after missing
    /// one full cycle of ping/pong.
    pub ping_interval: Duration,
    /// Largest batch accepted in a single frame.
    pub max_batch: usize,
    /// Encoders offered in addition to the built-in JSON encoder.
    pub encoders: Vec<SharedEncoder>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            max_batch: DEFAULT_MAX_BATCH,
            encoders: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    pub fn with_encoder(mut self, encoder: SharedEncoder) -> Self {
        self.encoders.push(encoder);
        self
    }
}
