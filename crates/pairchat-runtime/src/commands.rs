//! Commands from the presentation layer to the coordinator

/// Local user actions, processed in the order they are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Submit a chat message
    SendMessage(String),
    /// The composer content changed
    InputChanged(String),
    /// Set the typing indicator explicitly, bypassing the debounce
    SetTyping(bool),
    /// Leave the current partner and queue for another
    NextPartner,
    Shutdown,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::SendMessage(_) => "send_message",
            SessionCommand::InputChanged(_) => "input_changed",
            SessionCommand::SetTyping(_) => "set_typing",
            SessionCommand::NextPartner => "next_partner",
            SessionCommand::Shutdown => "shutdown",
        }
    }
}
