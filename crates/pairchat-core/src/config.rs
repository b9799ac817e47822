//! Configuration for the pure session components

use core::time::Duration;

// ----------------------------------------------------------------------------
// Typing Debounce Configuration
// ----------------------------------------------------------------------------

/// Configuration for the typing debouncer
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Inactivity period after which typing is reported as stopped
    pub quiet_period_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 2_000,
        }
    }
}

impl DebounceConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

// ----------------------------------------------------------------------------
// Grouping Configuration
// ----------------------------------------------------------------------------

/// Configuration for message grouping
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Largest gap between consecutive messages of one sender that still groups them
    pub threshold_ms: u64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 5 * 60 * 1000,
        }
    }
}
