//! WebSocket transport
//!
//! A background driver task owns the socket. It dials, announces itself with
//! `find_match`, forwards decoded frames to the registered sink and redials on loss
//! according to the reconnect policy. The public handle only talks to the driver through
//! a channel, a shared link flag and a cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use pairchat_core::{
    ClientEmit, EventSink, PairchatError, PairchatResult, ServerEvent, SinkSlot, Transport,
    TransportEvent,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::reconnect::ReconnectManager;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a live link ended
#[derive(Debug)]
enum LinkEnd {
    /// `disconnect()` was called or the handle was dropped
    Cancelled,
    /// Connection lost; eligible for reconnection
    Lost(String),
}

// ----------------------------------------------------------------------------
// Transport Handle
// ----------------------------------------------------------------------------

/// WebSocket connection to the matching service
pub struct WsTransport {
    config: TransportConfig,
    sinks: SinkSlot,
    connected: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<ClientEmit>>,
    cancel: Option<CancellationToken>,
    driver: Option<JoinHandle<()>>,
}

impl WsTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            sinks: SinkSlot::new(),
            connected: Arc::new(AtomicBool::new(false)),
            outbound: None,
            cancel: None,
            driver: None,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn driver_running(&self) -> bool {
        self.driver
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn register_sink(&self, sink: EventSink) {
        if self.sinks.replace(sink).is_some() {
            debug!("Replaced transport event sink");
        }
    }

    fn connect(&mut self) -> PairchatResult<()> {
        if self.driver_running() {
            debug!("Transport driver already running");
            return Ok(());
        }

        let url = self.config.parsed_url()?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let driver = Driver {
            url,
            config: self.config.clone(),
            sinks: self.sinks.clone(),
            connected: Arc::clone(&self.connected),
            outbound: outbound_rx,
            cancel: cancel.clone(),
        };

        info!("Connecting to {}", self.config.server_url);
        self.driver = Some(tokio::spawn(driver.run()));
        self.outbound = Some(outbound_tx);
        self.cancel = Some(cancel);
        Ok(())
    }

    fn emit(&self, emit: ClientEmit) {
        if !self.is_connected() {
            debug!("Not connected, discarding {}", emit.event_name());
            return;
        }

        if let Some(outbound) = &self.outbound {
            if outbound.send(emit).is_err() {
                debug!("Transport driver stopped, emission discarded");
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.outbound = None;

        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!("Transport driver ended abnormally: {}", e);
            }
            info!("Disconnected from {}", self.config.server_url);
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

// ----------------------------------------------------------------------------
// Driver Task
// ----------------------------------------------------------------------------

struct Driver {
    url: Url,
    config: TransportConfig,
    sinks: SinkSlot,
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedReceiver<ClientEmit>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let mut reconnect = ReconnectManager::new(self.config.reconnect.clone());

        loop {
            let dial = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = tokio::time::timeout(
                    self.config.connect_timeout(),
                    connect_async(self.url.as_str()),
                ) => result,
            };

            match dial {
                Ok(Ok((socket, _response))) => {
                    reconnect.reset();
                    match self.drive_link(socket).await {
                        LinkEnd::Cancelled => break,
                        LinkEnd::Lost(reason) => {
                            info!("Connection lost: {}", reason);
                            self.sinks.dispatch(TransportEvent::Disconnected { reason });
                        }
                    }
                }
                Ok(Err(e)) => self.report_dial_failure(e.to_string()),
                Err(_) => self.report_dial_failure(format!(
                    "timed out after {:?}",
                    self.config.connect_timeout()
                )),
            }

            match reconnect.next_delay() {
                Some(delay) => {
                    debug!(
                        "Reconnect attempt {} in {:?}",
                        reconnect.attempt_count(),
                        delay
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    let attempts = reconnect.attempt_count();
                    warn!("Giving up after {} reconnection attempts", attempts);
                    self.sinks
                        .dispatch(TransportEvent::ReconnectExhausted { attempts });
                    break;
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        debug!("Transport driver stopped");
    }

    async fn drive_link(&mut self, socket: Socket) -> LinkEnd {
        let (mut write, mut read) = socket.split();

        // Frames queued while the link was down are stale
        while self.outbound.try_recv().is_ok() {}

        self.connected.store(true, Ordering::SeqCst);
        info!("Connected to {}", self.url);
        self.sinks.dispatch(TransportEvent::Connected);

        let end = match write
            .send(Message::Text(ClientEmit::FindMatch.encode()))
            .await
        {
            Ok(()) => loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        let _ = write.send(Message::Close(None)).await;
                        break LinkEnd::Cancelled;
                    }
                    outbound = self.outbound.recv() => match outbound {
                        Some(emit) => {
                            if let Err(e) = write.send(Message::Text(emit.encode())).await {
                                break LinkEnd::Lost(e.to_string());
                            }
                        }
                        None => break LinkEnd::Cancelled,
                    },
                    inbound = read.next() => match inbound {
                        Some(Ok(Message::Text(text))) => self.forward(&text),
                        Some(Ok(Message::Binary(_))) => warn!("Dropping binary frame"),
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.to_string())
                                .filter(|r| !r.is_empty())
                                .unwrap_or_else(|| "closed by server".to_string());
                            break LinkEnd::Lost(reason);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break LinkEnd::Lost(e.to_string()),
                        None => break LinkEnd::Lost("stream ended".to_string()),
                    },
                }
            },
            Err(e) => LinkEnd::Lost(e.to_string()),
        };

        self.connected.store(false, Ordering::SeqCst);
        end
    }

    fn report_dial_failure(&self, reason: String) {
        let err = PairchatError::connect_failed(self.url.as_str(), reason);
        warn!("{}", err);
        self.sinks.dispatch(TransportEvent::Error(err.to_string()));
    }

    fn forward(&self, text: &str) {
        match ServerEvent::decode(text) {
            Ok(event) => {
                debug!("Received {}", event.event_name());
                self.sinks.dispatch(TransportEvent::Server(event));
            }
            Err(e) => warn!("Dropping frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;
    use pairchat_core::create_event_sink;

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut transport = WsTransport::new(TransportConfig::new("http://localhost:3000"));
        assert!(transport.connect().is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_emit_while_disconnected_is_accepted() {
        let transport = WsTransport::new(TransportConfig::default());
        transport.send_message("hello");
        transport.send_typing_status(true);
        transport.request_next_partner();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let config = TransportConfig::new("ws://127.0.0.1:9").with_reconnect(ReconnectConfig {
            delay_ms: 10_000,
            max_attempts: 5,
        });
        let mut transport = WsTransport::new(config);
        let (sink, _rx) = create_event_sink();
        transport.register_sink(sink);

        transport.connect().unwrap();
        transport.disconnect().await;
        transport.disconnect().await;
        assert!(!transport.is_connected());
    }
}
