//! Reconnect Backoff Policy
//!
//! The delay before reconnect attempt `n` is `first × factor^n`, capped at
//! `max`. A `retry:` field from the server replaces `first`.

use std::time::Duration;

/// Default first reconnect delay (browser `EventSource` default)
pub const DEFAULT_FIRST_DELAY_MS: u64 = 3000;

/// Default cap on reconnect delay
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Policy controlling reconnection after the stream drops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Reconnect at all
    pub enabled: bool,
    /// Delay before the first attempt
    pub first: Duration,
    /// Maximum delay
    pub max: Duration,
    /// Multiplicative growth per consecutive failure
    pub factor: f64,
    /// Give up after this many consecutive attempts (unbounded if `None`)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            first: Duration::from_millis(DEFAULT_FIRST_DELAY_MS),
            max: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            factor: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Policy that never reconnects
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Delay before the given attempt (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exponent);
        let max = self.max.as_secs_f64();

        if secs.is_finite() && secs < max {
            Duration::from_secs_f64(secs.max(0.0))
        } else {
            self.max
        }
    }

    /// Whether another attempt is allowed after `attempt` consecutive ones
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Apply a reconnection time announced by the server
    pub fn set_server_retry(&mut self, retry: Duration) {
        self.first = retry;
    }
}
