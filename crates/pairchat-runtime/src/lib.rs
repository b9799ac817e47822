//! PairChat Runtime
//!
//! This crate runs a chat session:
//! - `SessionCoordinator`: the single task that owns the session state
//! - `CoordinatorBuilder`: wires a transport to a session and starts the task
//! - `SessionHandle`: what a front end uses to send commands and observe state
//!
//! `pairchat-core` supplies the pure session logic; this crate only decides when each
//! piece runs.

pub mod builder;
pub mod commands;
pub mod config;
pub mod coordinator;

pub use builder::{CoordinatorBuilder, SessionHandle};
pub use commands::SessionCommand;
pub use config::CoordinatorConfig;
pub use coordinator::SessionCoordinator;

// Re-export core types for convenience
pub use pairchat_core::{
    ChatMessage, PairchatError, PairchatResult, SessionPhase, SessionSnapshot, Timestamp,
    TranscriptItem, UserId,
};
