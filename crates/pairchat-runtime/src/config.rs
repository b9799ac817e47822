//! Coordinator configuration

use pairchat_core::{DebounceConfig, GroupingConfig};

/// Configuration for the session coordinator
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Capacity of the command channel from the presentation layer
    pub command_buffer: usize,
    pub debounce: DebounceConfig,
    pub grouping: GroupingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            debounce: DebounceConfig::default(),
            grouping: GroupingConfig::default(),
        }
    }
}
