//! Configuration for the WebSocket transport

use std::time::Duration;

use pairchat_core::{PairchatError, PairchatResult, TransportError};
use url::Url;

// ----------------------------------------------------------------------------
// Reconnect Configuration
// ----------------------------------------------------------------------------

/// Fixed-delay reconnection policy
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before each reconnection attempt
    pub delay_ms: u64,
    /// Attempts after the first failed dial before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

// ----------------------------------------------------------------------------
// Transport Configuration
// ----------------------------------------------------------------------------

/// Configuration for [`crate::WsTransport`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Matching service endpoint (`ws://` or `wss://`)
    pub server_url: String,
    /// Upper bound on a single dial
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:3000".to_string(),
            connect_timeout_ms: 10_000,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parse the server URL, accepting only WebSocket schemes
    pub fn parsed_url(&self) -> PairchatResult<Url> {
        let invalid = || {
            PairchatError::from(TransportError::InvalidUrl {
                url: self.server_url.clone(),
            })
        };

        let url = Url::parse(&self.server_url).map_err(|_| invalid())?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.server_url, "ws://localhost:3000");
        assert_eq!(config.reconnect.delay(), Duration::from_secs(1));
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_url_validation() {
        assert!(TransportConfig::new("ws://localhost:3000").parsed_url().is_ok());
        assert!(TransportConfig::new("wss://chat.example.com/socket")
            .parsed_url()
            .is_ok());
        assert!(TransportConfig::new("http://localhost:3000").parsed_url().is_err());
        assert!(TransportConfig::new("not a url").parsed_url().is_err());
    }
}
