//! Session state machine
//!
//! `ChatSession` owns the phase and the message log. Transport events are applied one
//! at a time and each applied event yields a [`Transition`] describing what changed,
//! so the coordinator can log an audit trail without inspecting state before and after.
//!
//! Local actions never mutate the phase; they return the frame the coordinator should
//! hand to the transport.

use core::fmt;

use tracing::{debug, warn};

use crate::config::GroupingConfig;
use crate::grouping::{build_transcript, group_messages, TranscriptItem};
use crate::message::{ChatMessage, PARTNER_DISCONNECTED_NOTICE, PARTNER_LEFT_NOTICE};
use crate::protocol::{ClientEmit, ServerEvent, TransportEvent};
use crate::types::{Timestamp, UserId};

// ----------------------------------------------------------------------------
// Phase
// ----------------------------------------------------------------------------

/// Whether the client currently has a partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Queued for a partner, or between partners
    #[default]
    Waiting,
    /// Paired and exchanging messages
    Chatting,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Waiting => write!(f, "waiting"),
            SessionPhase::Chatting => write!(f, "chatting"),
        }
    }
}

// ----------------------------------------------------------------------------
// Transition Records
// ----------------------------------------------------------------------------

/// Observable consequence of applying an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    LogCleared,
    RoomAssigned(String),
    MessageAppended,
    NoticeAppended(&'static str),
    PartnerTypingChanged(bool),
    PartnerConnectedChanged(bool),
    LinkChanged(bool),
    ErrorReported(String),
}

/// Record of one applied event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub event: &'static str,
    pub effects: Vec<SessionEffect>,
}

impl Transition {
    pub fn changed_phase(&self) -> bool {
        self.from != self.to
    }
}

fn transport_event_name(event: &TransportEvent) -> &'static str {
    match event {
        TransportEvent::Connected => "connected",
        TransportEvent::Disconnected { .. } => "disconnected",
        TransportEvent::ReconnectExhausted { .. } => "reconnect_exhausted",
        TransportEvent::Server(server) => server.event_name(),
        TransportEvent::Error(_) => "transport_error",
    }
}

// ----------------------------------------------------------------------------
// Snapshot
// ----------------------------------------------------------------------------

/// Immutable copy of the session state handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user_id: UserId,
    pub phase: SessionPhase,
    pub messages: Vec<ChatMessage>,
    pub partner_typing: bool,
    pub local_typing: bool,
    /// Transport link is up
    pub link_connected: bool,
    /// Paired with a partner; gates input in the front end
    pub partner_connected: bool,
    pub room_id: Option<String>,
}

impl SessionSnapshot {
    /// Grouped, day-bucketed transcript using the default grouping threshold
    pub fn transcript<Tz>(&self, now: Timestamp, tz: &Tz) -> Vec<TranscriptItem>
    where
        Tz: chrono::TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.transcript_with(&GroupingConfig::default(), now, tz)
    }

    pub fn transcript_with<Tz>(
        &self,
        config: &GroupingConfig,
        now: Timestamp,
        tz: &Tz,
    ) -> Vec<TranscriptItem>
    where
        Tz: chrono::TimeZone,
        Tz::Offset: fmt::Display,
    {
        build_transcript(group_messages(&self.messages, config.threshold_ms), now, tz)
    }

    /// Whether a message was authored by the local user
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        message.sender == self.user_id
    }
}

// ----------------------------------------------------------------------------
// Chat Session
// ----------------------------------------------------------------------------

/// Single-owner session state
#[derive(Debug, Clone)]
pub struct ChatSession {
    user_id: UserId,
    phase: SessionPhase,
    log: Vec<ChatMessage>,
    partner_typing: bool,
    local_typing: bool,
    link_connected: bool,
    partner_connected: bool,
    room_id: Option<String>,
}

impl ChatSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            phase: SessionPhase::Waiting,
            log: Vec::new(),
            partner_typing: false,
            local_typing: false,
            link_connected: false,
            partner_connected: false,
            room_id: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn partner_typing(&self) -> bool {
        self.partner_typing
    }

    pub fn local_typing(&self) -> bool {
        self.local_typing
    }

    pub fn link_connected(&self) -> bool {
        self.link_connected
    }

    pub fn partner_connected(&self) -> bool {
        self.partner_connected
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id.clone(),
            phase: self.phase,
            messages: self.log.clone(),
            partner_typing: self.partner_typing,
            local_typing: self.local_typing,
            link_connected: self.link_connected,
            partner_connected: self.partner_connected,
            room_id: self.room_id.clone(),
        }
    }

    /// Apply a transport event received at `now`
    ///
    /// Returns `None` when the event does not apply to the current phase.
    pub fn apply(&mut self, event: TransportEvent, now: Timestamp) -> Option<Transition> {
        let from = self.phase;
        let name = transport_event_name(&event);

        let effects = match event {
            TransportEvent::Connected => {
                self.link_connected = true;
                vec![SessionEffect::LinkChanged(true)]
            }
            TransportEvent::Disconnected { .. } | TransportEvent::ReconnectExhausted { .. } => {
                self.link_connected = false;
                let mut effects = vec![SessionEffect::LinkChanged(false)];
                self.clear_partner_typing(&mut effects);
                effects
            }
            TransportEvent::Error(message) => {
                warn!("Transport error: {}", message);
                vec![SessionEffect::ErrorReported(message)]
            }
            TransportEvent::Server(server) => self.apply_server(server, now)?,
        };

        Some(Transition {
            from,
            to: self.phase,
            event: name,
            effects,
        })
    }

    fn apply_server(&mut self, event: ServerEvent, now: Timestamp) -> Option<Vec<SessionEffect>> {
        let mut effects = Vec::new();

        match event {
            ServerEvent::WaitingForMatch => {
                self.phase = SessionPhase::Waiting;
                self.clear_partner_typing(&mut effects);
                self.set_partner_connected(false, &mut effects);
            }
            ServerEvent::ChatStarted { room_id } => {
                self.phase = SessionPhase::Chatting;
                self.log.clear();
                effects.push(SessionEffect::LogCleared);
                effects.push(SessionEffect::RoomAssigned(room_id.clone()));
                self.room_id = Some(room_id);
                self.clear_partner_typing(&mut effects);
                self.set_partner_connected(true, &mut effects);
            }
            ServerEvent::ReceiveMessage { sender, message } => {
                if self.phase != SessionPhase::Chatting {
                    debug!("Ignoring message from {} while waiting", sender);
                    return None;
                }
                if sender == self.user_id {
                    warn!("Dropping echo of own message");
                    return None;
                }
                if sender.is_system() {
                    warn!("Dropping inbound message claiming the reserved system sender");
                    return None;
                }
                self.log.push(ChatMessage::new(sender, message, now));
                effects.push(SessionEffect::MessageAppended);
            }
            ServerEvent::PartnerTyping(is_typing) => {
                if self.partner_typing != is_typing {
                    self.partner_typing = is_typing;
                    effects.push(SessionEffect::PartnerTypingChanged(is_typing));
                }
            }
            ServerEvent::PartnerLeft => {
                self.end_partnership(PARTNER_LEFT_NOTICE, now, &mut effects)?;
            }
            ServerEvent::PartnerDisconnected => {
                self.end_partnership(PARTNER_DISCONNECTED_NOTICE, now, &mut effects)?;
            }
            ServerEvent::Error(message) => {
                warn!("Server error: {}", message);
                effects.push(SessionEffect::ErrorReported(message));
            }
        }

        Some(effects)
    }

    fn end_partnership(
        &mut self,
        notice: &'static str,
        now: Timestamp,
        effects: &mut Vec<SessionEffect>,
    ) -> Option<()> {
        if self.phase != SessionPhase::Chatting {
            debug!("Ignoring partner loss while waiting: {}", notice);
            return None;
        }

        self.phase = SessionPhase::Waiting;
        self.log.push(ChatMessage::system(notice, now));
        effects.push(SessionEffect::NoticeAppended(notice));
        self.set_partner_connected(false, effects);
        self.clear_partner_typing(effects);
        Some(())
    }

    fn clear_partner_typing(&mut self, effects: &mut Vec<SessionEffect>) {
        if self.partner_typing {
            self.partner_typing = false;
            effects.push(SessionEffect::PartnerTypingChanged(false));
        }
    }

    fn set_partner_connected(&mut self, connected: bool, effects: &mut Vec<SessionEffect>) {
        if self.partner_connected != connected {
            self.partner_connected = connected;
            effects.push(SessionEffect::PartnerConnectedChanged(connected));
        }
    }

    // ------------------------------------------------------------------------
    // Local Actions
    // ------------------------------------------------------------------------

    /// Record a locally authored message and return the frame to send
    ///
    /// Whitespace-only input is rejected without an emission. The text is sent as typed.
    pub fn send_local_message(&mut self, text: &str, now: Timestamp) -> Option<ClientEmit> {
        if text.trim().is_empty() {
            return None;
        }

        self.log
            .push(ChatMessage::new(self.user_id.clone(), text, now));
        self.local_typing = false;

        Some(ClientEmit::SendMessage {
            message: text.to_string(),
        })
    }

    pub fn request_next_partner(&self) -> ClientEmit {
        ClientEmit::Next
    }

    pub fn change_typing_status(&mut self, is_typing: bool) -> ClientEmit {
        self.local_typing = is_typing;
        ClientEmit::Typing { is_typing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(event: ServerEvent) -> TransportEvent {
        TransportEvent::Server(event)
    }

    fn chat_started(room: &str) -> TransportEvent {
        server(ServerEvent::ChatStarted {
            room_id: room.to_string(),
        })
    }

    fn received(sender: &str, text: &str) -> TransportEvent {
        server(ServerEvent::ReceiveMessage {
            sender: UserId::new(sender),
            message: text.to_string(),
        })
    }

    fn chatting_session() -> ChatSession {
        let mut session = ChatSession::new(UserId::new("me"));
        session.apply(chat_started("room-1"), Timestamp::new(0));
        session
    }

    #[test]
    fn test_initial_state() {
        let session = ChatSession::new(UserId::new("me"));
        assert_eq!(session.phase(), SessionPhase::Waiting);
        assert!(session.log().is_empty());
        assert!(!session.partner_connected());
        assert!(!session.link_connected());
    }

    #[test]
    fn test_chat_started_clears_log_from_any_phase() {
        let mut session = chatting_session();
        session.apply(received("p", "hello"), Timestamp::new(10));
        assert_eq!(session.log().len(), 1);

        let transition = session.apply(chat_started("room-2"), Timestamp::new(20)).unwrap();
        assert_eq!(transition.from, SessionPhase::Chatting);
        assert_eq!(transition.to, SessionPhase::Chatting);
        assert!(transition.effects.contains(&SessionEffect::LogCleared));
        assert!(session.log().is_empty());
        assert_eq!(session.room_id(), Some("room-2"));

        session.apply(server(ServerEvent::PartnerLeft), Timestamp::new(30));
        assert_eq!(session.log().len(), 1);
        session.apply(chat_started("room-3"), Timestamp::new(40));
        assert!(session.log().is_empty());
        assert_eq!(session.phase(), SessionPhase::Chatting);
        assert!(session.partner_connected());
    }

    #[test]
    fn test_waiting_for_match_keeps_log() {
        let mut session = chatting_session();
        session.apply(received("p", "hello"), Timestamp::new(10));

        let transition = session
            .apply(server(ServerEvent::WaitingForMatch), Timestamp::new(20))
            .unwrap();
        assert!(transition.changed_phase());
        assert_eq!(session.phase(), SessionPhase::Waiting);
        assert_eq!(session.log().len(), 1);
        assert!(!session.partner_connected());
    }

    #[test]
    fn test_received_message_uses_receive_time() {
        let mut session = chatting_session();
        let transition = session.apply(received("p", "hi"), Timestamp::new(1234)).unwrap();

        assert_eq!(transition.effects, vec![SessionEffect::MessageAppended]);
        assert_eq!(session.log()[0].sent_at, Timestamp::new(1234));
        assert_eq!(session.log()[0].sender, UserId::new("p"));
    }

    #[test]
    fn test_message_while_waiting_is_ignored() {
        let mut session = ChatSession::new(UserId::new("me"));
        assert!(session.apply(received("p", "hi"), Timestamp::new(1)).is_none());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_own_echo_is_dropped() {
        let mut session = chatting_session();
        session.send_local_message("hello", Timestamp::new(5));
        assert!(session.apply(received("me", "hello"), Timestamp::new(6)).is_none());
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_inbound_system_sender_is_dropped() {
        let mut session = chatting_session();
        let forged = session.apply(received("system", PARTNER_LEFT_NOTICE), Timestamp::new(7));

        assert!(forged.is_none());
        assert!(session.log().is_empty());
        assert_eq!(session.phase(), SessionPhase::Chatting);
        assert!(session.partner_connected());
    }

    #[test]
    fn test_partner_left_appends_one_notice() {
        let mut session = chatting_session();
        session.apply(server(ServerEvent::PartnerTyping(true)), Timestamp::new(1));

        let transition = session
            .apply(server(ServerEvent::PartnerLeft), Timestamp::new(50))
            .unwrap();
        assert_eq!(transition.to, SessionPhase::Waiting);
        assert_eq!(session.log().len(), 1);
        let notice = &session.log()[0];
        assert!(notice.is_system());
        assert_eq!(notice.text, PARTNER_LEFT_NOTICE);
        assert_eq!(notice.sent_at, Timestamp::new(50));
        assert!(!session.partner_typing());
        assert!(!session.partner_connected());

        // A duplicate loss event changes nothing
        assert!(session
            .apply(server(ServerEvent::PartnerDisconnected), Timestamp::new(60))
            .is_none());
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_partner_disconnected_appends_one_notice() {
        let mut session = chatting_session();
        session.apply(server(ServerEvent::PartnerDisconnected), Timestamp::new(7));

        assert_eq!(session.phase(), SessionPhase::Waiting);
        let system: Vec<_> = session.log().iter().filter(|m| m.is_system()).collect();
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].text, PARTNER_DISCONNECTED_NOTICE);
    }

    #[test]
    fn test_partner_typing_in_any_phase() {
        let mut session = ChatSession::new(UserId::new("me"));
        let transition = session
            .apply(server(ServerEvent::PartnerTyping(true)), Timestamp::new(1))
            .unwrap();
        assert_eq!(
            transition.effects,
            vec![SessionEffect::PartnerTypingChanged(true)]
        );
        assert!(session.partner_typing());

        // Repeated value is applied but reports no change
        let transition = session
            .apply(server(ServerEvent::PartnerTyping(true)), Timestamp::new(2))
            .unwrap();
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn test_errors_never_change_phase() {
        let mut session = chatting_session();
        let transition = session
            .apply(server(ServerEvent::Error("oops".to_string())), Timestamp::new(1))
            .unwrap();
        assert!(!transition.changed_phase());

        let transition = session
            .apply(TransportEvent::Error("socket reset".to_string()), Timestamp::new(2))
            .unwrap();
        assert_eq!(
            transition.effects,
            vec![SessionEffect::ErrorReported("socket reset".to_string())]
        );
        assert_eq!(session.phase(), SessionPhase::Chatting);
    }

    #[test]
    fn test_link_events_keep_phase() {
        let mut session = chatting_session();
        session.apply(TransportEvent::Connected, Timestamp::new(1));
        assert!(session.link_connected());

        session.apply(
            TransportEvent::Disconnected {
                reason: "closed".to_string(),
            },
            Timestamp::new(2),
        );
        assert!(!session.link_connected());
        assert_eq!(session.phase(), SessionPhase::Chatting);

        session.apply(TransportEvent::Connected, Timestamp::new(3));
        session.apply(TransportEvent::ReconnectExhausted { attempts: 5 }, Timestamp::new(4));
        assert!(!session.link_connected());
        assert_eq!(session.phase(), SessionPhase::Chatting);
    }

    #[test]
    fn test_send_local_message() {
        let mut session = chatting_session();
        session.change_typing_status(true);

        let emit = session.send_local_message("  hi there ", Timestamp::new(9));
        assert_eq!(
            emit,
            Some(ClientEmit::SendMessage {
                message: "  hi there ".to_string()
            })
        );
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log()[0].sender, UserId::new("me"));
        assert!(!session.local_typing());
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let mut session = chatting_session();
        assert_eq!(session.send_local_message("", Timestamp::new(1)), None);
        assert_eq!(session.send_local_message(" \t\n", Timestamp::new(2)), None);
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_next_partner_keeps_phase() {
        let session = chatting_session();
        assert_eq!(session.request_next_partner(), ClientEmit::Next);
        assert_eq!(session.phase(), SessionPhase::Chatting);
    }

    #[test]
    fn test_snapshot_transcript() {
        let mut session = chatting_session();
        session.apply(received("p", "one"), Timestamp::new(1_000));
        session.send_local_message("two", Timestamp::new(2_000));

        let snapshot = session.snapshot();
        assert!(snapshot.is_own(&snapshot.messages[1]));
        let items = snapshot.transcript(Timestamp::new(3_000), &chrono::Utc);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], TranscriptItem::DaySeparator("Today".to_string()));
    }
}
