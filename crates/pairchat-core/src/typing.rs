//! Local typing indicator debouncing
//!
//! Turns a stream of input snapshots into `typing` on/off transitions. Whether the input is
//! empty is reported as soon as it changes. A non-empty input that goes quiet for the
//! configured period falls back to `false`, and sending a message reports `false` at once.
//!
//! The debouncer owns no timer. Callers poll [`TypingDebouncer::deadline`] and call
//! [`TypingDebouncer::on_deadline`] when it passes, which keeps this type usable from a
//! single `select!` loop.

use core::time::Duration;
use tokio::time::Instant;

use crate::config::DebounceConfig;

/// Debouncer for the local "is typing" signal
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    quiet_period: Duration,
    last_emitted: bool,
    deadline: Option<Instant>,
}

impl TypingDebouncer {
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            quiet_period: config.quiet_period(),
            last_emitted: false,
            deadline: None,
        }
    }

    /// Last value reported to the partner
    pub fn last_emitted(&self) -> bool {
        self.last_emitted
    }

    /// Currently armed quiet deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record an input snapshot, returning the new status when it differs from the last one
    pub fn on_input(&mut self, content: &str, now: Instant) -> Option<bool> {
        self.deadline = Some(now + self.quiet_period);

        let is_typing = !content.is_empty();
        if is_typing == self.last_emitted {
            return None;
        }
        self.last_emitted = is_typing;
        Some(is_typing)
    }

    /// Handle a timer wake-up at `now`
    ///
    /// Wake-ups before the armed deadline belong to a replaced deadline and are ignored.
    pub fn on_deadline(&mut self, now: Instant) -> Option<bool> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.settle()
            }
            _ => None,
        }
    }

    /// Disarm and report `false` immediately if typing was reported
    pub fn force_idle(&mut self) -> Option<bool> {
        self.deadline = None;
        self.settle()
    }

    /// Align with a status that was set explicitly, bypassing the debounce
    pub fn override_status(&mut self, is_typing: bool) {
        self.last_emitted = is_typing;
        if !is_typing {
            self.deadline = None;
        }
    }

    /// Disarm without reporting anything
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.last_emitted = false;
    }

    fn settle(&mut self) -> Option<bool> {
        if self.last_emitted {
            self.last_emitted = false;
            Some(false)
        } else {
            None
        }
    }
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(&DebounceConfig::default())
    }
}
