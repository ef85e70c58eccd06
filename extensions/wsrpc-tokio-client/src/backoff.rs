use crate::client_config::ReconnectConfig;
use std::time::Duration;
use wsrpc::constants::CLOSE_CODE_NORMAL;

/// Doubling delay between reconnect attempts, capped at a maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            current: min,
        }
    }

    /// Returns the delay to wait now and doubles it for the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}

/// Decides whether, and after how long, to reconnect when a connection ends.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    enabled: bool,
    backoff: Backoff,
}

impl ReconnectPolicy {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            enabled: config.enabled,
            backoff: Backoff::new(config.wait_min, config.wait_max),
        }
    }

    pub fn on_open(&mut self) {
        self.backoff.reset();
    }

    /// `code` is the close code received, if any. `explicit` is set when the
    /// close was requested locally.
    pub fn on_close(&mut self, code: Option<u16>, explicit: bool) -> Option<Duration> {
        if explicit || !self.enabled || code == Some(CLOSE_CODE_NORMAL) {
            return None;
        }
        Some(self.backoff.next_delay())
    }
}
