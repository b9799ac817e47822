//! Wire protocol spoken with the matching service
//!
//! Every frame is a JSON text message of the form `{"event": "<name>", "data": <payload>}`.
//! `data` is omitted for events that carry no payload.
//!
//! Inbound (server → client): `waiting_for_match`, `chat_started`, `receive_message`,
//! `partner_typing`, `partner_left`, `partner_disconnected`, `error`.
//!
//! Outbound (client → server): `find_match`, `send_message`, `typing`, `next`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ProtocolError;
use crate::types::UserId;

// ----------------------------------------------------------------------------
// Frame Envelope
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
}

impl Frame {
    fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame {
            reason: e.to_string(),
        })
    }

    fn render(event: &str, data: Value) -> String {
        if data.is_null() {
            json!({ "event": event }).to_string()
        } else {
            json!({ "event": event, "data": data }).to_string()
        }
    }
}

fn invalid_payload(event: &str, reason: impl ToString) -> ProtocolError {
    ProtocolError::InvalidPayload {
        event: event.to_string(),
        reason: reason.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Inbound Events
// ----------------------------------------------------------------------------

/// Events pushed by the matching service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Queued; no partner yet
    WaitingForMatch,
    /// Paired with a new partner
    ChatStarted { room_id: String },
    /// Partner sent a message; the service does not timestamp it
    ReceiveMessage { sender: UserId, message: String },
    /// Partner's typing indicator changed
    PartnerTyping(bool),
    /// Partner requested a new match
    PartnerLeft,
    /// Partner's connection dropped
    PartnerDisconnected,
    /// Service-side error report
    Error(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatStartedPayload {
    room_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReceiveMessagePayload {
    sender: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    is_typing: bool,
}

impl ServerEvent {
    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::WaitingForMatch => "waiting_for_match",
            ServerEvent::ChatStarted { .. } => "chat_started",
            ServerEvent::ReceiveMessage { .. } => "receive_message",
            ServerEvent::PartnerTyping(_) => "partner_typing",
            ServerEvent::PartnerLeft => "partner_left",
            ServerEvent::PartnerDisconnected => "partner_disconnected",
            ServerEvent::Error(_) => "error",
        }
    }

    /// Decode an inbound text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame = Frame::parse(text)?;
        let event = frame.event.as_str();

        match event {
            "waiting_for_match" => Ok(ServerEvent::WaitingForMatch),
            "chat_started" => {
                let payload: ChatStartedPayload = serde_json::from_value(frame.data)
                    .map_err(|e| invalid_payload(event, e))?;
                Ok(ServerEvent::ChatStarted {
                    room_id: payload.room_id,
                })
            }
            "receive_message" => {
                let payload: ReceiveMessagePayload = serde_json::from_value(frame.data)
                    .map_err(|e| invalid_payload(event, e))?;
                Ok(ServerEvent::ReceiveMessage {
                    sender: UserId::new(payload.sender),
                    message: payload.message,
                })
            }
            "partner_typing" => match frame.data {
                Value::Bool(flag) => Ok(ServerEvent::PartnerTyping(flag)),
                // Some relays wrap the flag the same way the client does
                data @ Value::Object(_) => serde_json::from_value::<TypingPayload>(data)
                    .map(|p| ServerEvent::PartnerTyping(p.is_typing))
                    .map_err(|e| invalid_payload(event, e)),
                other => Err(invalid_payload(
                    event,
                    format!("expected boolean, got {}", other),
                )),
            },
            "partner_left" => Ok(ServerEvent::PartnerLeft),
            "partner_disconnected" => Ok(ServerEvent::PartnerDisconnected),
            "error" => match frame.data {
                Value::String(message) => Ok(ServerEvent::Error(message)),
                Value::Null => Ok(ServerEvent::Error("unknown error".to_string())),
                other => Ok(ServerEvent::Error(other.to_string())),
            },
            _ => Err(ProtocolError::UnknownEvent {
                event: frame.event,
            }),
        }
    }

    /// Encode as a text frame (used by relays and test servers)
    pub fn encode(&self) -> String {
        let data = match self {
            ServerEvent::ChatStarted { room_id } => json!({ "roomId": room_id }),
            ServerEvent::ReceiveMessage { sender, message } => {
                json!({ "sender": sender.as_str(), "message": message })
            }
            ServerEvent::PartnerTyping(flag) => Value::Bool(*flag),
            ServerEvent::Error(message) => Value::String(message.clone()),
            ServerEvent::WaitingForMatch
            | ServerEvent::PartnerLeft
            | ServerEvent::PartnerDisconnected => Value::Null,
        };
        Frame::render(self.event_name(), data)
    }
}

// ----------------------------------------------------------------------------
// Outbound Emissions
// ----------------------------------------------------------------------------

/// Frames the client sends to the matching service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEmit {
    /// Ask to be queued for a partner; sent automatically on every connect
    FindMatch,
    SendMessage { message: String },
    Typing { is_typing: bool },
    /// Leave the current partner and look for another
    Next,
}

impl ClientEmit {
    /// Wire name of the emission
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEmit::FindMatch => "find_match",
            ClientEmit::SendMessage { .. } => "send_message",
            ClientEmit::Typing { .. } => "typing",
            ClientEmit::Next => "next",
        }
    }

    /// Encode as a text frame
    pub fn encode(&self) -> String {
        let data = match self {
            ClientEmit::SendMessage { message } => json!({ "message": message }),
            ClientEmit::Typing { is_typing } => json!({ "isTyping": is_typing }),
            ClientEmit::FindMatch | ClientEmit::Next => Value::Null,
        };
        Frame::render(self.event_name(), data)
    }

    /// Decode an outbound frame (used by relays and test servers)
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame = Frame::parse(text)?;
        let event = frame.event.as_str();

        match event {
            "find_match" => Ok(ClientEmit::FindMatch),
            "next" => Ok(ClientEmit::Next),
            "send_message" => frame
                .data
                .get("message")
                .and_then(Value::as_str)
                .map(|message| ClientEmit::SendMessage {
                    message: message.to_string(),
                })
                .ok_or_else(|| invalid_payload(event, "missing string field `message`")),
            "typing" => frame
                .data
                .get("isTyping")
                .and_then(Value::as_bool)
                .map(|is_typing| ClientEmit::Typing { is_typing })
                .ok_or_else(|| invalid_payload(event, "missing boolean field `isTyping`")),
            _ => Err(ProtocolError::UnknownEvent {
                event: frame.event,
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// Everything a transport reports to its sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Link established (initially or after a reconnect)
    Connected,
    /// Link lost; reconnection may follow
    Disconnected { reason: String },
    /// Reconnection policy gave up
    ReconnectExhausted { attempts: u32 },
    /// A decoded frame from the service
    Server(ServerEvent),
    /// Informational transport-level failure
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inbound_events() {
        assert_eq!(
            ServerEvent::decode(r#"{"event":"waiting_for_match"}"#).unwrap(),
            ServerEvent::WaitingForMatch
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"chat_started","data":{"roomId":"room-7"}}"#)
                .unwrap(),
            ServerEvent::ChatStarted {
                room_id: "room-7".to_string()
            }
        );
        assert_eq!(
            ServerEvent::decode(
                r#"{"event":"receive_message","data":{"sender":"abc","message":"hi"}}"#
            )
            .unwrap(),
            ServerEvent::ReceiveMessage {
                sender: UserId::new("abc"),
                message: "hi".to_string()
            }
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"partner_typing","data":true}"#).unwrap(),
            ServerEvent::PartnerTyping(true)
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"partner_typing","data":{"isTyping":false}}"#)
                .unwrap(),
            ServerEvent::PartnerTyping(false)
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"partner_left"}"#).unwrap(),
            ServerEvent::PartnerLeft
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"partner_disconnected","data":null}"#).unwrap(),
            ServerEvent::PartnerDisconnected
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"error","data":"room full"}"#).unwrap(),
            ServerEvent::Error("room full".to_string())
        );
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(matches!(
            ServerEvent::decode("not json"),
            Err(ProtocolError::MalformedFrame { .. })
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"data":true}"#),
            Err(ProtocolError::MalformedFrame { .. })
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"event":"teleport"}"#),
            Err(ProtocolError::UnknownEvent { .. })
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"event":"chat_started","data":{"room":"x"}}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"event":"receive_message","data":{"sender":"a"}}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"event":"partner_typing","data":"yes"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_encode_outbound_frames() {
        assert_eq!(ClientEmit::FindMatch.encode(), r#"{"event":"find_match"}"#);
        assert_eq!(ClientEmit::Next.encode(), r#"{"event":"next"}"#);

        let frame: Value = serde_json::from_str(
            &ClientEmit::SendMessage {
                message: "hello".to_string(),
            }
            .encode(),
        )
        .unwrap();
        assert_eq!(frame["event"], "send_message");
        assert_eq!(frame["data"]["message"], "hello");

        let frame: Value =
            serde_json::from_str(&ClientEmit::Typing { is_typing: true }.encode()).unwrap();
        assert_eq!(frame["event"], "typing");
        assert_eq!(frame["data"]["isTyping"], true);
    }

    #[test]
    fn test_relay_side_codec_matches_client_side() {
        let emit = ClientEmit::Typing { is_typing: false };
        assert_eq!(ClientEmit::decode(&emit.encode()).unwrap(), emit);

        let event = ServerEvent::ChatStarted {
            room_id: "r1".to_string(),
        };
        assert_eq!(ServerEvent::decode(&event.encode()).unwrap(), event);

        assert!(matches!(
            ClientEmit::decode(r#"{"event":"send_message","data":{}}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }
}
