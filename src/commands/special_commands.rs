//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` are handled locally instead of being sent to the
//! assistant. Command names are case-insensitive; arguments are kept as typed
//! because directives are matched exactly.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show session state and expiry
    ShowStatus,

    /// Display help information
    Help,

    /// Log in again (prompts for NIF and mobile number)
    Login,

    /// Forget the stored session
    Logout,

    /// Run a directive string
    Directive(String),

    /// List the actions offered by the last bot reply and the quick replies
    ListActions,

    /// Trigger action number `n` (1-based) from the list
    Action(usize),

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as chat text
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use pacc_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/do ecliente#clients#42").unwrap();
/// assert_eq!(cmd, SpecialCommand::Directive("ecliente#clients#42".to_string()));
///
/// let cmd = parse_special_command("hola").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/status" => no_argument(&name, arg, SpecialCommand::ShowStatus),
        "/help" | "/?" => no_argument(&name, arg, SpecialCommand::Help),
        "/login" => no_argument(&name, arg, SpecialCommand::Login),
        "/logout" => no_argument(&name, arg, SpecialCommand::Logout),
        "/actions" => no_argument(&name, arg, SpecialCommand::ListActions),
        "/exit" | "/quit" => no_argument(&name, arg, SpecialCommand::Exit),

        "/do" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/do".to_string(),
                    usage: "/do <directive>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Directive(arg.to_string()))
            }
        }

        "/action" | "/a" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/action".to_string(),
                    usage: "/action <number>".to_string(),
                });
            }
            match arg.parse::<usize>() {
                Ok(n) if n > 0 => Ok(SpecialCommand::Action(n)),
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/action".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }

        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

fn no_argument(
    name: &str,
    arg: &str,
    command: SpecialCommand,
) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: name.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Print help for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSION:
  /status         - Show whether you are logged in and when the session expires
  /login          - Log in again with NIF and mobile number
  /logout         - Forget the stored session

ACTIONS:
  /actions        - List the actions of the last reply and the quick replies
  /action <n>     - Run action number n (alias: /a <n>)
  /do <directive> - Run a directive; `ecliente#<entity>#<id>` opens eCliente,
                    anything else is sent as a message

OTHER:
  /help           - Show this help
  /exit, exit     - Leave the chat (also /quit, quit, Ctrl-D)

Anything else you type is sent to the assistant.
"#
    );
}
