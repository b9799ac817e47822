//! PairChat CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! - built-in defaults
//! - `pairchat.toml` in the working directory
//! - `~/.pairchat/config.toml`
//! - `PAIRCHAT_*` environment variables (`__` separates nesting, e.g.
//!   `PAIRCHAT_TRANSPORT__SERVER_URL`)
//! - command line arguments
//!
//! An explicit `--config` file replaces both file layers.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use pairchat_runtime::CoordinatorConfig;
use pairchat_transport::TransportConfig;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the PairChat CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Connection to the matching service
    pub transport: TransportConfig,

    /// Typing debounce and message grouping
    pub session: CoordinatorConfig,

    pub logging: LoggingConfig,

    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable debug-level logging
    pub verbose: bool,
}

/// Terminal front end options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Label shown for the partner's messages
    pub partner_label: String,

    /// Render clock times in UTC instead of local time
    pub utc: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            partner_label: "Stranger".to_string(),
            utc: false,
        }
    }
}

/// Values taken from the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub server_url: Option<String>,
    pub verbose: Option<bool>,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration with the standard priority order
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        figment = match &overrides.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Loading(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                figment.merge(Toml::file(path))
            }
            None => {
                let figment = figment.merge(Toml::file("pairchat.toml"));
                match Self::default_config_path() {
                    Some(path) => figment.merge(Toml::file(path)),
                    None => figment,
                }
            }
        };

        figment = figment.merge(Env::prefixed("PAIRCHAT_").split("__"));

        if let Some(url) = &overrides.server_url {
            figment = figment.merge(("transport.server_url", url));
        }
        if let Some(verbose) = overrides.verbose {
            figment = figment.merge(("logging.verbose", verbose));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file path only
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path (`~/.pairchat/config.toml`)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".pairchat").join("config.toml"))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport
            .parsed_url()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.transport.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.transport.reconnect.delay_ms == 0 {
            return Err(ConfigError::Validation(
                "Reconnect delay must be greater than 0".to_string(),
            ));
        }

        if self.session.debounce.quiet_period_ms == 0 {
            return Err(ConfigError::Validation(
                "Typing quiet period must be greater than 0".to_string(),
            ));
        }

        if self.session.grouping.threshold_ms == 0 {
            return Err(ConfigError::Validation(
                "Grouping threshold must be greater than 0".to_string(),
            ));
        }

        if self.session.command_buffer == 0 {
            return Err(ConfigError::Validation(
                "Command buffer must hold at least one command".to_string(),
            ));
        }

        Ok(())
    }

    /// Create example configuration file content
    pub fn example_config() -> Result<String, toml::ser::Error> {
        let mut example = AppConfig::default();
        example.transport.server_url = "wss://chat.example.com/socket".to_string();

        toml::to_string_pretty(&example)
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
