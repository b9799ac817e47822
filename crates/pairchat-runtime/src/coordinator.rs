//! Session Coordinator Task
//!
//! One task owns the session. Its loop waits on three sources: transport events, local
//! commands and the typing quiet deadline. Every item is handled to completion before
//! the next is taken, and the resulting state is published as a `SessionSnapshot`.

use pairchat_core::{
    ChatSession, EventReceiver, PairchatResult, SessionSnapshot, TimeSource,
    Transport, TransportEvent, TypingDebouncer,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::commands::SessionCommand;

// ----------------------------------------------------------------------------
// Session Coordinator
// ----------------------------------------------------------------------------

/// The task that reconciles transport events, local input and typing timers
pub struct SessionCoordinator<T: Transport> {
    session: ChatSession,
    transport: T,
    debouncer: TypingDebouncer,
    /// Events forwarded by the transport's registered sink
    events: EventReceiver,
    /// Commands from the presentation layer
    commands: mpsc::Receiver<SessionCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    time_source: Box<dyn TimeSource + Send>,
    events_open: bool,
    running: bool,
}

impl<T: Transport> SessionCoordinator<T> {
    pub(crate) fn new(
        session: ChatSession,
        transport: T,
        debouncer: TypingDebouncer,
        events: EventReceiver,
        commands: mpsc::Receiver<SessionCommand>,
        snapshots: watch::Sender<SessionSnapshot>,
        time_source: Box<dyn TimeSource + Send>,
    ) -> Self {
        Self {
            session,
            transport,
            debouncer,
            events,
            commands,
            snapshots,
            time_source,
            events_open: true,
            running: true,
        }
    }

    /// Run until shutdown is requested or every command sender is gone
    pub async fn run(mut self) -> PairchatResult<()> {
        info!("Session coordinator starting for {}", self.session.user_id());

        while self.running {
            let typing_deadline = self.debouncer.deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                },

                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!("Transport event channel closed");
                        self.events_open = false;
                    }
                },

                _ = sleep_until(typing_deadline.unwrap_or_else(Instant::now)),
                    if typing_deadline.is_some() => {
                    if let Some(is_typing) = self.debouncer.on_deadline(Instant::now()) {
                        self.emit_typing(is_typing);
                    }
                }
            }

            self.publish();
        }

        // Pending typing deadline dies with the session
        self.debouncer.cancel();
        self.transport.disconnect().await;
        info!("Session coordinator stopped");
        Ok(())
    }

    fn handle_event(&mut self, event: TransportEvent) {
        let now = self.time_source.now();

        match self.session.apply(event, now) {
            Some(transition) if transition.changed_phase() => {
                info!(
                    "Session {} -> {} on {}",
                    transition.from, transition.to, transition.event
                );
                debug!("Effects: {:?}", transition.effects);
            }
            Some(transition) => {
                debug!("Applied {}: {:?}", transition.event, transition.effects);
            }
            None => {}
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!("Processing command {}", command.name());

        match command {
            SessionCommand::SendMessage(text) => {
                let now = self.time_source.now();
                match self.session.send_local_message(&text, now) {
                    Some(emit) => {
                        self.transport.emit(emit);
                        if let Some(is_typing) = self.debouncer.force_idle() {
                            self.emit_typing(is_typing);
                        }
                    }
                    None => debug!("Ignoring blank message"),
                }
            }
            SessionCommand::InputChanged(content) => {
                if let Some(is_typing) = self.debouncer.on_input(&content, Instant::now()) {
                    self.emit_typing(is_typing);
                }
            }
            SessionCommand::SetTyping(is_typing) => {
                self.debouncer.override_status(is_typing);
                self.emit_typing(is_typing);
            }
            SessionCommand::NextPartner => {
                self.transport.emit(self.session.request_next_partner());
            }
            SessionCommand::Shutdown => {
                info!("Shutdown requested");
                self.running = false;
            }
        }
    }

    fn emit_typing(&mut self, is_typing: bool) {
        let emit = self.session.change_typing_status(is_typing);
        self.transport.emit(emit);
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
