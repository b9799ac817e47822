//! PairChat CLI library
//!
//! Command-line parsing, layered configuration and the line-oriented terminal front end
//! for the `pairchat` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod terminal;

pub use cli::{Cli, Commands};
pub use config::{AppConfig, ConfigOverrides};
pub use error::{CliError, Result};
pub use terminal::TerminalApp;
