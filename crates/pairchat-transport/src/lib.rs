//! WebSocket transport for PairChat
//!
//! Implements the `Transport` trait from `pairchat-core` over tokio-tungstenite.
//! Frames are JSON text messages; a driver task handles dialing, reconnection and
//! fan-out of inbound events to the registered sink.

pub mod config;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod reconnect;
pub mod ws;

pub use config::{ReconnectConfig, TransportConfig};
#[cfg(any(test, feature = "testing"))]
pub use mock::MockTransport;
pub use reconnect::ReconnectManager;
pub use ws::WsTransport;
