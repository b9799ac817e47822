//! Chat log entries

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

/// Notice appended when the partner leaves voluntarily
pub const PARTNER_LEFT_NOTICE: &str = "Your partner has left the chat";

/// Notice appended when the partner's connection drops
pub const PARTNER_DISCONNECTED_NOTICE: &str = "Your partner has disconnected";

/// A single entry in the session log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: UserId,
    pub text: String,
    pub sent_at: Timestamp,
}

impl ChatMessage {
    pub fn new(sender: UserId, text: impl Into<String>, sent_at: Timestamp) -> Self {
        Self {
            sender,
            text: text.into(),
            sent_at,
        }
    }

    /// Create a synthetic notice attributed to the reserved system sender
    pub fn system(text: impl Into<String>, sent_at: Timestamp) -> Self {
        Self::new(UserId::system(), text, sent_at)
    }

    pub fn is_system(&self) -> bool {
        self.sender.is_system()
    }
}
