//! Transport capability
//!
//! The coordinator only needs a connection that can be opened, written to, observed
//! and closed. Concrete implementations live in `pairchat-transport`.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::PairchatResult;
use crate::protocol::{ClientEmit, TransportEvent};

// ----------------------------------------------------------------------------
// Event Sink
// ----------------------------------------------------------------------------

/// Channel end a transport forwards its events into
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;
/// Receiving end paired with an [`EventSink`]
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create a sink/receiver pair
pub fn create_event_sink() -> (EventSink, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Replaceable slot holding the currently registered sink
///
/// Registration replaces the previous sink wholesale. Events dispatched while the slot
/// is empty are dropped.
#[derive(Debug, Clone, Default)]
pub struct SinkSlot {
    inner: Arc<RwLock<Option<EventSink>>>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new sink, returning the one it replaced
    pub fn replace(&self, sink: EventSink) -> Option<EventSink> {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        slot.replace(sink)
    }

    pub fn is_registered(&self) -> bool {
        self.inner
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Forward an event to the current sink; returns whether it was delivered
    pub fn dispatch(&self, event: TransportEvent) -> bool {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(sink) => match sink.send(event) {
                Ok(()) => true,
                Err(err) => {
                    debug!("Event sink closed, dropping {:?}", err.0);
                    false
                }
            },
            None => {
                debug!("No sink registered, dropping {:?}", event);
                false
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Connection to the matching service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Replace the sink inbound events are forwarded to
    fn register_sink(&self, sink: EventSink);

    /// Open the connection in the background; `find_match` is sent on every successful
    /// connect. Calling this while a connection is already being driven is a no-op.
    fn connect(&mut self) -> PairchatResult<()>;

    /// Fire-and-forget emission; silently accepted while disconnected
    fn emit(&self, emit: ClientEmit);

    /// Tear down the connection and stop reconnecting. Idempotent.
    async fn disconnect(&mut self);

    /// Whether the link is currently up
    fn is_connected(&self) -> bool;

    fn send_message(&self, text: &str) {
        self.emit(ClientEmit::SendMessage {
            message: text.to_string(),
        });
    }

    fn send_typing_status(&self, is_typing: bool) {
        self.emit(ClientEmit::Typing { is_typing });
    }

    fn request_next_partner(&self) {
        self.emit(ClientEmit::Next);
    }
}
