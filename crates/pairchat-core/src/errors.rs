//! Error types for PairChat
//!
//! Protocol errors describe frames the client could not interpret, transport
//! errors describe link failures, and `PairchatError` unifies them.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised while decoding frames from the matching service
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },
    #[error("Unknown event: {event}")]
    UnknownEvent { event: String },
    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// Specific transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid server URL: {url}")]
    InvalidUrl { url: String },
    #[error("Connection to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },
}

// ----------------------------------------------------------------------------
// Core Error Type
// ----------------------------------------------------------------------------

/// Core error type for PairChat
#[derive(Debug, thiserror::Error)]
pub enum PairchatError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel communication error between tasks
    #[error("Channel error: {message}")]
    Channel { message: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl PairchatError {
    /// Create a channel error with a message
    pub fn channel_error<T: Into<String>>(message: T) -> Self {
        PairchatError::Channel {
            message: message.into(),
        }
    }

    /// Create a transport connection failed error
    pub fn connect_failed<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        PairchatError::Transport(TransportError::ConnectFailed {
            url: url.into(),
            reason: reason.into(),
        })
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, PairchatError>;
pub type PairchatResult<T> = Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PairchatError::connect_failed("ws://localhost:3000", "refused");
        assert_eq!(
            err.to_string(),
            "Transport error: Connection to ws://localhost:3000 failed: refused"
        );

        let err: PairchatError = ProtocolError::UnknownEvent {
            event: "bogus".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Protocol error: Unknown event: bogus");
    }
}
