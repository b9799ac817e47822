//! Mock Transport for Testing
//!
//! Deterministic stand-in for [`crate::WsTransport`]. Clones share state, so a test can
//! hand one clone to the coordinator and keep another to inject events and inspect the
//! frames that were emitted.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pairchat_core::{
    ClientEmit, EventSink, PairchatResult, ServerEvent, SinkSlot, Transport, TransportEvent,
};
use tracing::debug;

use crate::config::ReconnectConfig;

#[derive(Debug, Default)]
struct MockState {
    emitted: Mutex<Vec<ClientEmit>>,
    discarded: Mutex<Vec<ClientEmit>>,
    connected: AtomicBool,
    failures_remaining: AtomicU32,
    connect_calls: AtomicU32,
    disconnect_calls: AtomicU32,
}

/// Mock transport for deterministic testing
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    sinks: SinkSlot,
    state: Arc<MockState>,
    reconnect: ReconnectConfig,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Make the next `count` dials fail
    pub fn fail_next_connects(&self, count: u32) {
        self.state.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Deliver an event to the registered sink
    pub fn inject(&self, event: TransportEvent) -> bool {
        self.sinks.dispatch(event)
    }

    pub fn inject_server(&self, event: ServerEvent) -> bool {
        self.inject(TransportEvent::Server(event))
    }

    /// Simulate an unexpected link loss
    pub fn drop_link(&self, reason: &str) {
        self.state.connected.store(false, Ordering::SeqCst);
        self.inject(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Frames accepted while connected, in emission order
    pub fn emitted(&self) -> Vec<ClientEmit> {
        lock(&self.state.emitted).clone()
    }

    /// Frames accepted while disconnected and never sent
    pub fn discarded(&self) -> Vec<ClientEmit> {
        lock(&self.state.discarded).clone()
    }

    pub fn clear_emitted(&self) {
        lock(&self.state.emitted).clear();
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.state.disconnect_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.state
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    fn register_sink(&self, sink: EventSink) {
        self.sinks.replace(sink);
    }

    /// Runs the dial/retry sequence synchronously, without delays
    fn connect(&mut self) -> PairchatResult<()> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_connected() {
            return Ok(());
        }

        for _ in 0..=self.reconnect.max_attempts {
            if self.take_failure() {
                self.inject(TransportEvent::Error("mock connect failed".to_string()));
                continue;
            }

            self.state.connected.store(true, Ordering::SeqCst);
            self.inject(TransportEvent::Connected);
            lock(&self.state.emitted).push(ClientEmit::FindMatch);
            return Ok(());
        }

        self.inject(TransportEvent::ReconnectExhausted {
            attempts: self.reconnect.max_attempts,
        });
        Ok(())
    }

    fn emit(&self, emit: ClientEmit) {
        if self.is_connected() {
            lock(&self.state.emitted).push(emit);
        } else {
            debug!("Mock not connected, discarding {}", emit.event_name());
            lock(&self.state.discarded).push(emit);
        }
    }

    async fn disconnect(&mut self) {
        self.state.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.state.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}
