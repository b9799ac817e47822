//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Matching service URL (ws:// or wss://)
    #[arg(short, long)]
    pub server: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Join the queue and chat with a stranger
    Chat,
    /// Print an example configuration file
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "pairchat",
            "--verbose",
            "--server",
            "wss://chat.example.com",
            "chat",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.server.as_deref(), Some("wss://chat.example.com"));
        assert!(matches!(cli.command, Commands::Chat));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["pairchat"]).is_err());
    }
}
