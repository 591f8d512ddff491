use crate::types::constants::{RECONNECT_ATTEMPTS, RECONNECT_DELAY, RECONNECT_DELAY_MAX};
use std::time::Duration;

/// Reconnection settings applied by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether a lost connection is retried at all
    pub enabled: bool,
    /// Attempts made before the transport gives up
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * delay`
    pub delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: RECONNECT_ATTEMPTS,
            delay: Duration::from_millis(RECONNECT_DELAY),
            max_delay: Duration::from_millis(RECONNECT_DELAY_MAX),
        }
    }
}

/// Timer for reconnection logic with bounded, linearly growing delays
pub struct Timer {
    attempts: u32,
    policy: ReconnectPolicy,
}

impl Timer {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            attempts: 0,
            policy,
        }
    }

    /// Get the next delay duration, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.policy.enabled || self.attempts >= self.policy.max_attempts {
            return None;
        }

        self.attempts += 1;
        let delay = self.policy.delay.saturating_mul(self.attempts);
        Some(delay.min(self.policy.max_delay))
    }

    /// Attempts consumed since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reset the timer
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
