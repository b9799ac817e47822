//! PairChat Core
//!
//! Foundational types and pure logic for one-on-one anonymous chat:
//! - the data model (`ChatMessage`, `UserId`, `Timestamp`)
//! - the wire protocol spoken with the matching service and its JSON frame codec
//! - the `Transport` capability the coordinator drives
//! - the session state machine, typing debouncer and message grouper
//!
//! Nothing in this crate owns a socket or spawns a task; the runtime crate wires
//! these pieces into an event loop.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod grouping;
pub mod message;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;
pub mod typing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{DebounceConfig, GroupingConfig};
pub use errors::{PairchatError, PairchatResult, ProtocolError, Result, TransportError};
pub use grouping::{
    build_transcript, day_label, format_clock, group_messages, MessageGroup, TranscriptItem,
};
pub use message::{ChatMessage, PARTNER_DISCONNECTED_NOTICE, PARTNER_LEFT_NOTICE};
pub use protocol::{ClientEmit, ServerEvent, TransportEvent};
pub use session::{ChatSession, SessionEffect, SessionPhase, SessionSnapshot, Transition};
pub use transport::{create_event_sink, EventReceiver, EventSink, SinkSlot, Transport};
pub use types::{SystemTimeSource, TimeSource, Timestamp, UserId};
pub use typing::TypingDebouncer;
