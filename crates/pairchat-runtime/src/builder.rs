//! Coordinator Builder and Session Handle
//!
//! The builder wires a transport to a fresh session, connects it and spawns the
//! coordinator. The returned handle is what a front end talks to.

use core::fmt;

use pairchat_core::{
    create_event_sink, ChatSession, GroupingConfig, PairchatError, PairchatResult,
    SessionSnapshot, SystemTimeSource, TimeSource, Timestamp, TranscriptItem, Transport,
    TypingDebouncer, UserId,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::commands::SessionCommand;
use crate::config::CoordinatorConfig;
use crate::coordinator::SessionCoordinator;

// ----------------------------------------------------------------------------
// Coordinator Builder
// ----------------------------------------------------------------------------

/// Builder for a session coordinator over any transport
pub struct CoordinatorBuilder<T: Transport> {
    transport: T,
    config: CoordinatorConfig,
    user_id: Option<UserId>,
    time_source: Box<dyn TimeSource + Send>,
}

impl<T: Transport + 'static> CoordinatorBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: CoordinatorConfig::default(),
            user_id: None,
            time_source: Box::new(SystemTimeSource::new()),
        }
    }

    /// Set the coordinator configuration
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a fixed identity instead of generating one
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Override the wall clock used to timestamp log entries
    pub fn with_time_source(mut self, time_source: impl TimeSource + Send + 'static) -> Self {
        self.time_source = Box::new(time_source);
        self
    }

    /// Connect the transport and assemble the coordinator without spawning it
    pub fn build(self) -> PairchatResult<(SessionCoordinator<T>, SessionHandle)> {
        let user_id = self.user_id.unwrap_or_else(UserId::generate);
        let session = ChatSession::new(user_id.clone());

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (sink, events) = create_event_sink();

        let mut transport = self.transport;
        transport.register_sink(sink);
        transport.connect()?;

        let coordinator = SessionCoordinator::new(
            session,
            transport,
            TypingDebouncer::new(&self.config.debounce),
            events,
            command_rx,
            snapshot_tx,
            self.time_source,
        );

        let handle = SessionHandle {
            user_id,
            grouping: self.config.grouping,
            commands: command_tx,
            snapshots: snapshot_rx,
            task: None,
        };

        Ok((coordinator, handle))
    }

    /// Build and start the coordinator task
    pub fn start(self) -> PairchatResult<SessionHandle> {
        let (coordinator, mut handle) = self.build()?;
        info!("Starting session for {}", handle.user_id);
        handle.task = Some(tokio::spawn(coordinator.run()));
        Ok(handle)
    }
}

// ----------------------------------------------------------------------------
// Session Handle
// ----------------------------------------------------------------------------

/// Presentation-side handle to a running session
pub struct SessionHandle {
    user_id: UserId,
    grouping: GroupingConfig,
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<PairchatResult<()>>>,
}

impl SessionHandle {
    /// Identity used for this session
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Transcript of the latest state, grouped with the configured threshold
    pub fn transcript<Tz>(&self, now: Timestamp, tz: &Tz) -> Vec<TranscriptItem>
    where
        Tz: chrono::TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.snapshots
            .borrow()
            .transcript_with(&self.grouping, now, tz)
    }

    pub async fn send_message(&self, text: impl Into<String>) -> PairchatResult<()> {
        self.send_command(SessionCommand::SendMessage(text.into()))
            .await
    }

    /// Report the current composer content for typing detection
    pub async fn input_changed(&self, content: impl Into<String>) -> PairchatResult<()> {
        self.send_command(SessionCommand::InputChanged(content.into()))
            .await
    }

    pub async fn change_typing_status(&self, is_typing: bool) -> PairchatResult<()> {
        self.send_command(SessionCommand::SetTyping(is_typing))
            .await
    }

    pub async fn request_next_partner(&self) -> PairchatResult<()> {
        self.send_command(SessionCommand::NextPartner).await
    }

    /// Send a command to the coordinator
    pub async fn send_command(&self, command: SessionCommand) -> PairchatResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PairchatError::channel_error("Session coordinator is not running"))
    }

    /// Check if the coordinator task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the coordinator and wait for it to disconnect the transport
    pub async fn shutdown(&mut self) -> PairchatResult<()> {
        info!("Shutting down session");
        let _ = self.send_command(SessionCommand::Shutdown).await;
        self.wait().await
    }

    /// Wait for the coordinator task to complete
    pub async fn wait(&mut self) -> PairchatResult<()> {
        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                PairchatError::channel_error(format!("Session coordinator panicked: {}", e))
            })?,
            None => Ok(()),
        }
    }
}
