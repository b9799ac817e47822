//! Reconnection bookkeeping

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Tracks consecutive failed dials against a fixed-delay policy
#[derive(Debug)]
pub struct ReconnectManager {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectManager {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the policy is exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;
        Some(self.config.delay())
    }

    /// Reset the reconnection state (call on successful connection)
    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Get current attempt count
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.config.max_attempts
    }
}
