//! Line-oriented terminal front end
//!
//! Reads commands and messages from stdin and prints the transcript as it grows. The
//! transcript is rebuilt from each published snapshot; only lines that were not printed
//! before are written out.

use core::fmt;

use anyhow::Context;
use chrono::{Local, TimeZone, Utc};
use pairchat_core::{format_clock, SessionPhase, SessionSnapshot, Timestamp, TranscriptItem};
use pairchat_runtime::SessionHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::config::UiConfig;

const HELP: &str = "Commands: /next (find a new partner), /typing on|off, /help, /quit";

// ----------------------------------------------------------------------------
// Input Parsing
// ----------------------------------------------------------------------------

/// What a line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Send(String),
    Next,
    Typing(bool),
    Help,
    Quit,
    /// Blank line
    Ignore,
    Unknown(String),
}

pub fn parse_input(line: &str) -> InputAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputAction::Ignore;
    }

    if !trimmed.starts_with('/') {
        return InputAction::Send(line.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("/next"), None) => InputAction::Next,
        (Some("/quit") | Some("/exit"), None) => InputAction::Quit,
        (Some("/help"), None) => InputAction::Help,
        (Some("/typing"), Some("on")) => InputAction::Typing(true),
        (Some("/typing"), Some("off")) => InputAction::Typing(false),
        _ => InputAction::Unknown(trimmed.to_string()),
    }
}

// ----------------------------------------------------------------------------
// Transcript Rendering
// ----------------------------------------------------------------------------

/// Incremental renderer for the grouped transcript
#[derive(Debug, Clone)]
pub struct TranscriptView {
    partner_label: String,
    printed: Vec<String>,
    /// Room and log length the printed lines were rendered from
    room_id: Option<String>,
    message_count: usize,
}

impl TranscriptView {
    pub fn new(partner_label: impl Into<String>) -> Self {
        Self {
            partner_label: partner_label.into(),
            printed: Vec::new(),
            room_id: None,
            message_count: 0,
        }
    }

    /// Render the full transcript of a snapshot
    pub fn render<Tz>(&self, snapshot: &SessionSnapshot, now: Timestamp, tz: &Tz) -> Vec<String>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut lines = Vec::new();

        for item in snapshot.transcript(now, tz) {
            match item {
                TranscriptItem::DaySeparator(label) => lines.push(format!("--- {} ---", label)),
                TranscriptItem::Group(group) if group.is_system() => {
                    lines.extend(group.messages.iter().map(|m| format!("* {}", m.text)));
                }
                TranscriptItem::Group(group) => {
                    let author = if group.sender == snapshot.user_id {
                        "You"
                    } else {
                        self.partner_label.as_str()
                    };
                    lines.push(format!(
                        "[{}] {}:",
                        format_clock(group.group_start, tz),
                        author
                    ));
                    lines.extend(group.messages.iter().map(|m| format!("    {}", m.text)));
                }
            }
        }

        lines
    }

    /// Lines not yet printed for this snapshot
    ///
    /// A new room or a shrunken log starts a fresh transcript, even when the snapshot that
    /// cleared the log was never observed.
    pub fn update<Tz>(&mut self, snapshot: &SessionSnapshot, now: Timestamp, tz: &Tz) -> Vec<String>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if snapshot.room_id != self.room_id || snapshot.messages.len() < self.message_count {
            self.printed.clear();
            self.room_id = snapshot.room_id.clone();
        }
        self.message_count = snapshot.messages.len();

        let lines = self.render(snapshot, now, tz);
        let common = self
            .printed
            .iter()
            .zip(&lines)
            .take_while(|(printed, line)| printed == line)
            .count();

        let fresh = lines[common..].to_vec();
        self.printed = lines;
        fresh
    }
}

/// Status lines describing what changed between two snapshots
pub fn status_changes(
    prev: &SessionSnapshot,
    next: &SessionSnapshot,
    partner_label: &str,
) -> Vec<String> {
    let mut lines = Vec::new();

    if prev.link_connected && !next.link_connected {
        lines.push("Connection lost. Reconnecting...".to_string());
    } else if !prev.link_connected && next.link_connected {
        lines.push("Connected to server.".to_string());
    }

    let new_room = next.room_id.is_some() && next.room_id != prev.room_id;
    match (prev.phase, next.phase) {
        (_, SessionPhase::Chatting) if new_room || prev.phase == SessionPhase::Waiting => {
            lines.push(format!(
                "You are now chatting with a {}. Say hi!",
                partner_label.to_lowercase()
            ));
        }
        (SessionPhase::Chatting, SessionPhase::Waiting) => {
            lines.push("Looking for a partner...".to_string());
        }
        _ => {}
    }

    if !prev.partner_typing && next.partner_typing {
        lines.push(format!("{} is typing...", partner_label));
    }

    lines
}

// ----------------------------------------------------------------------------
// Interactive Application
// ----------------------------------------------------------------------------

/// Interactive chat loop over stdin/stdout
pub struct TerminalApp {
    handle: SessionHandle,
    ui: UiConfig,
    view: TranscriptView,
}

impl TerminalApp {
    pub fn new(handle: SessionHandle, ui: UiConfig) -> Self {
        let view = TranscriptView::new(ui.partner_label.clone());
        Self { handle, ui, view }
    }

    /// Give the session back, e.g. to shut it down
    pub fn into_handle(self) -> SessionHandle {
        self.handle
    }

    /// Run until `/quit`, end of input, or the session stops
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut snapshots = self.handle.subscribe();
        let mut last = snapshots.borrow_and_update().clone();

        println!("{}", HELP);
        println!("Looking for a partner...");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read from stdin")? {
                        Some(line) => {
                            if !self.handle_line(&line, &last).await? {
                                break;
                            }
                        }
                        None => {
                            debug!("End of input");
                            break;
                        }
                    }
                }

                changed = snapshots.changed() => {
                    if changed.is_err() {
                        info!("Session ended");
                        break;
                    }
                    let next = snapshots.borrow_and_update().clone();
                    for line in status_changes(&last, &next, &self.ui.partner_label) {
                        println!("{}", line);
                    }
                    for line in self.render_update(&next) {
                        println!("{}", line);
                    }
                    last = next;
                }
            }
        }

        Ok(())
    }

    fn render_update(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let now = Timestamp::now();
        if self.ui.utc {
            self.view.update(snapshot, now, &Utc)
        } else {
            self.view.update(snapshot, now, &Local)
        }
    }

    /// Returns `false` when the user asked to quit
    async fn handle_line(&self, line: &str, current: &SessionSnapshot) -> anyhow::Result<bool> {
        match parse_input(line) {
            InputAction::Send(text) => {
                if current.partner_connected {
                    self.handle.send_message(text).await?;
                } else {
                    println!("Not chatting with anyone yet; message not sent.");
                }
            }
            InputAction::Next => {
                self.handle.request_next_partner().await?;
                println!("Looking for a new partner...");
            }
            InputAction::Typing(is_typing) => {
                self.handle.change_typing_status(is_typing).await?;
            }
            InputAction::Help => println!("{}", HELP),
            InputAction::Quit => return Ok(false),
            InputAction::Ignore => {}
            InputAction::Unknown(command) => println!("Unknown command {}. {}", command, HELP),
        }
        Ok(true)
    }
}
