//! PairChat CLI entry point

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use pairchat_cli::{
    cli::{Cli, Commands},
    config::{AppConfig, ConfigOverrides},
    error::Result,
    terminal::TerminalApp,
};
use pairchat_runtime::CoordinatorBuilder;
use pairchat_transport::WsTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_configuration(&cli)?;

    // Initialize logging
    setup_logging(config.logging.verbose);

    match cli.command {
        Commands::Config => {
            print!("{}", AppConfig::example_config()?);
            std::io::stdout().flush()?;
            Ok(())
        }
        Commands::Chat => {
            if let Err(e) = run_chat(config).await {
                error!("Chat session failed: {}", e);
                std::process::exit(1);
            }
            info!("PairChat exited successfully");
            Ok(())
        }
    }
}

async fn run_chat(config: AppConfig) -> Result<()> {
    info!("Connecting to {}", config.transport.server_url);

    let transport = WsTransport::new(config.transport.clone());
    let handle = CoordinatorBuilder::new(transport)
        .with_config(config.session.clone())
        .start()?;
    info!("Chatting as {}", handle.user_id());

    let mut app = TerminalApp::new(handle, config.ui.clone());
    let outcome = app.run().await;

    let mut handle = app.into_handle();
    handle.shutdown().await?;
    outcome?;
    Ok(())
}

/// Setup logging based on verbosity level
///
/// Logs go to stderr so they do not interleave with the transcript on stdout.
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load layered configuration with command line overrides applied last
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let overrides = ConfigOverrides {
        config_file: cli.config.as_ref().map(PathBuf::from),
        server_url: cli.server.clone(),
        verbose: cli.verbose.then_some(true),
    };

    Ok(AppConfig::load(&overrides)?)
}
