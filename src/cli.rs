//! Command-line interface definition for pacc-chat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, login and one-shot actions.

use clap::{Parser, Subcommand};

/// pacc-chat - terminal client for the PACC assistant
///
/// Log in with your NIF and mobile number, then chat with the assistant.
/// The session token is kept locally for two hours.
#[derive(Parser, Debug, Clone)]
#[command(name = "pacc-chat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the chat API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the eCliente base URL used for deep links
    #[arg(long)]
    pub ecliente_url: Option<String>,

    /// Keep the session in memory only (nothing is written to disk)
    #[arg(long)]
    pub ephemeral: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for pacc-chat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start interactive chat mode
    Chat,

    /// Authenticate and store a fresh session
    Login {
        /// Tax identifier (NIF); upper-cased before sending
        #[arg(long)]
        nif: Option<String>,

        /// Mobile phone number
        #[arg(long)]
        movil: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a valid session is stored and when it expires
    Status,

    /// Send a single message and print the reply
    Send {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Run a directive (`ecliente#entity#id` opens a link, anything else is chat text)
    Open {
        /// Directive string
        directive: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["pacc-chat", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat));
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.ephemeral);
    }

    #[test]
    fn test_cli_parse_login_with_credentials() {
        let cli =
            Cli::try_parse_from(["pacc-chat", "login", "--nif", "12345678z", "--movil", "600"])
                .unwrap();
        if let Commands::Login { nif, movil } = cli.command {
            assert_eq!(nif, Some("12345678z".to_string()));
            assert_eq!(movil, Some("600".to_string()));
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_login_without_credentials() {
        let cli = Cli::try_parse_from(["pacc-chat", "login"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login {
                nif: None,
                movil: None
            }
        ));
    }

    #[test]
    fn test_cli_parse_send_joins_words() {
        let cli = Cli::try_parse_from(["pacc-chat", "send", "hello", "there"]).unwrap();
        if let Commands::Send { text } = cli.command {
            assert_eq!(text.join(" "), "hello there");
        } else {
            panic!("Expected Send command");
        }
    }

    #[test]
    fn test_cli_parse_send_requires_text() {
        assert!(Cli::try_parse_from(["pacc-chat", "send"]).is_err());
    }

    #[test]
    fn test_cli_parse_open_directive() {
        let cli = Cli::try_parse_from(["pacc-chat", "open", "ecliente#clients#42"]).unwrap();
        if let Commands::Open { directive } = cli.command {
            assert_eq!(directive, "ecliente#clients#42");
        } else {
            panic!("Expected Open command");
        }
    }

    #[test]
    fn test_cli_global_overrides() {
        let cli = Cli::try_parse_from([
            "pacc-chat",
            "--api-url",
            "https://api.example.com",
            "--ecliente-url",
            "https://ecliente.example.com",
            "-v",
            "status",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(
            cli.ecliente_url.as_deref(),
            Some("https://ecliente.example.com")
        );
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["pacc-chat"]).is_err());
    }
}
