//! pacc-chat - Terminal client for the PACC customer assistant
//!
#![doc = "pacc-chat - Terminal client for the PACC customer assistant"]
#![doc = "Main entry point for the pacc-chat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pacc_chat::cli::{Cli, Commands};
use pacc_chat::commands;
use pacc_chat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Login { nif, movil } => {
            tracing::info!("Starting login");
            commands::auth::login(config, nif, movil).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(config)?;
            Ok(())
        }
        Commands::Status => {
            commands::auth::status(config)?;
            Ok(())
        }
        Commands::Send { text } => {
            let text = text.join(" ");
            tracing::debug!("Sending one-shot message: {}", text);
            commands::send::send_message(config, text).await?;
            Ok(())
        }
        Commands::Open { directive } => {
            tracing::debug!("Running directive: {}", directive);
            commands::send::open_directive(config, directive).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never mix with the rendered conversation.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pacc_chat=debug" } else { "pacc_chat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
