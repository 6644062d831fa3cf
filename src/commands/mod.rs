/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive chat mode
- `auth`: Login, logout and session status
- `send`: One-shot message and directive execution

The handlers only wire configuration into a [`Dispatcher`] and print what
comes back; all chat semantics live in the library.
*/

use crate::api::ApiClient;
use crate::config::Config;
use crate::directive::{extract_actions, LinkOpener, PrintOpener, SystemOpener};
use crate::dispatcher::{Dispatcher, Intent, Outcome};
use crate::error::{PaccChatError, Result};
use crate::render::TerminalSink;
use crate::session::{open_store, SessionManager};
use crate::transcript::MessageSink;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

// Special commands parser for the interactive loop
pub mod special_commands;

/// Dispatcher type used by the terminal commands
pub type TerminalDispatcher = Dispatcher<ApiClient, TerminalSink<std::io::Stdout>>;

/// Builds a dispatcher from configuration, rendering to stdout
///
/// # Errors
///
/// Returns error if the API client or the session store cannot be created
pub fn build_dispatcher(config: &Config) -> Result<TerminalDispatcher> {
    let sink = TerminalSink::stdout(config.chat.html_policy, config.chat.notification_sound);
    build_dispatcher_with_sink(config, sink)
}

/// Builds a dispatcher from configuration with a caller-supplied sink
///
/// # Errors
///
/// Returns error if the API client or the session store cannot be created
pub fn build_dispatcher_with_sink<S: MessageSink>(
    config: &Config,
    sink: S,
) -> Result<Dispatcher<ApiClient, S>> {
    let backend = ApiClient::new(&config.api, config.messages.clone())?;
    let sessions =
        SessionManager::with_duration(open_store(&config.session)?, config.session.duration_ms);
    let opener: Box<dyn LinkOpener> = if config.chat.open_links {
        Box::new(SystemOpener)
    } else {
        Box::new(PrintOpener)
    };
    Ok(Dispatcher::new(backend, sessions, sink, &config.api.ecliente_url).with_opener(opener))
}

/// Prints the user-visible result of an intent that is not a chat reply
///
/// Chat replies are already rendered by the sink.
fn report_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::LoggedIn(_) => println!("{}", "Sesión iniciada".green()),
        Outcome::LoginFailed(e) => eprintln!("{}", e.message().red()),
        Outcome::LinkOpened(url) => println!("{} {}", "Abriendo".cyan(), url),
        Outcome::LinkFailed(e) => eprintln!("{}", format!("Error: {}", e).red()),
        Outcome::Locked => eprintln!("{}", "Inicie sesión primero (/login)".yellow()),
        Outcome::Replied(_) | Outcome::ReplyFailed(_) | Outcome::Ignored => {}
    }
}

/// Reads one line, mapping Ctrl-C and Ctrl-D to `None`
fn ask_line(rl: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    match rl.readline(prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Asks for NIF and mobile number on the terminal
///
/// Returns `None` when the user aborts with Ctrl-C or Ctrl-D.
fn prompt_credentials(rl: &mut DefaultEditor) -> Result<Option<(String, String)>> {
    let Some(nif) = ask_line(rl, "NIF: ")? else {
        return Ok(None);
    };
    let Some(movil) = ask_line(rl, "Móvil: ")? else {
        return Ok(None);
    };
    Ok(Some((nif, movil)))
}

/// Runs the login form until it succeeds or the user gives up
///
/// Returns true once a session is held.
async fn login_gate<S: MessageSink>(
    dispatcher: &mut Dispatcher<ApiClient, S>,
    rl: &mut DefaultEditor,
) -> Result<bool> {
    println!("{}", "Identifíquese para continuar".bold());
    loop {
        let Some((nif, movil)) = prompt_credentials(rl)? else {
            return Ok(false);
        };

        println!("{}", "Procesando...".dimmed());
        let outcome = dispatcher.dispatch(Intent::SubmitLogin { nif, movil }).await;
        report_outcome(&outcome);
        if matches!(outcome, Outcome::LoggedIn(_)) {
            return Ok(true);
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Restores the stored session (or asks for credentials), then runs a
    //! readline loop that sends every non-command line to the assistant.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::directive::Action;

    /// Something the user can trigger with `/action <n>`
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MenuEntry {
        /// Preset prompt sent as chat text
        QuickReply(String),
        /// Action found in the last bot reply
        Reply(Action),
    }

    impl MenuEntry {
        /// Intent triggered by the entry
        pub fn intent(&self) -> Intent {
            match self {
                Self::QuickReply(text) => Intent::QuickReply(text.clone()),
                Self::Reply(action) => Intent::InvokeDirective(action.directive.clone()),
            }
        }

        fn label(&self) -> &str {
            match self {
                Self::QuickReply(text) => text,
                Self::Reply(action) => &action.label,
            }
        }
    }

    /// Builds the numbered action menu: reply actions first, then quick replies
    pub fn build_menu(last_reply: Option<&str>, quick_replies: &[String]) -> Vec<MenuEntry> {
        let mut menu: Vec<MenuEntry> = last_reply
            .map(extract_actions)
            .unwrap_or_default()
            .into_iter()
            .map(MenuEntry::Reply)
            .collect();
        menu.extend(quick_replies.iter().cloned().map(MenuEntry::QuickReply));
        menu
    }

    fn print_menu(menu: &[MenuEntry]) {
        if menu.is_empty() {
            println!("{}", "No hay acciones disponibles".dimmed());
            return;
        }
        for (i, entry) in menu.iter().enumerate() {
            println!("  {} {}", format!("[{}]", i + 1).cyan(), entry.label());
        }
        println!();
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut dispatcher = build_dispatcher(&config)?;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner();

        if dispatcher.start().is_none() && !login_gate(&mut dispatcher, &mut rl).await? {
            println!("Goodbye!");
            return Ok(());
        }

        let mut menu = build_menu(None, &config.chat.quick_replies);
        if !menu.is_empty() {
            print_menu(&menu);
        }

        loop {
            let prompt = format!("{} ", ">>".green().bold());
            let line = match rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            rl.add_history_entry(trimmed)?;

            let intent = match parse_special_command(trimmed) {
                Ok(SpecialCommand::None) => Intent::SubmitChat(trimmed.to_string()),
                Ok(SpecialCommand::Exit) => break,
                Ok(SpecialCommand::Help) => {
                    print_help();
                    continue;
                }
                Ok(SpecialCommand::ShowStatus) => {
                    print_status(&dispatcher);
                    continue;
                }
                Ok(SpecialCommand::ListActions) => {
                    print_menu(&menu);
                    continue;
                }
                Ok(SpecialCommand::Login) => {
                    login_gate(&mut dispatcher, &mut rl).await?;
                    continue;
                }
                Ok(SpecialCommand::Logout) => {
                    dispatcher.logout()?;
                    println!("{}", "Sesión cerrada".yellow());
                    if !login_gate(&mut dispatcher, &mut rl).await? {
                        break;
                    }
                    continue;
                }
                Ok(SpecialCommand::Directive(raw)) => Intent::InvokeDirective(raw),
                Ok(SpecialCommand::Action(n)) => match menu.get(n - 1) {
                    Some(entry) => entry.intent(),
                    None => {
                        eprintln!("{}", format!("No existe la acción {}", n).red());
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("{}", e.to_string().red());
                    continue;
                }
            };

            let outcome = dispatcher.dispatch(intent).await;
            report_outcome(&outcome);

            if matches!(outcome, Outcome::Replied(_)) {
                let last = dispatcher
                    .sink()
                    .last_bot_message()
                    .map(|m| m.body.clone());
                menu = build_menu(last.as_deref(), &config.chat.quick_replies);
                let offered = menu
                    .iter()
                    .filter(|e| matches!(e, MenuEntry::Reply(_)))
                    .count();
                if offered > 0 {
                    print_menu(&menu);
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                 PACC Chat - Bienvenido                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status(dispatcher: &TerminalDispatcher) {
        match dispatcher.session() {
            Some(session) => println!(
                "Sesión activa, caduca en {} min\n",
                session.remaining_ms(dispatcher.now_ms()) / 60_000
            ),
            None => println!("Sin sesión\n"),
        }
    }

}

// Login, logout and status
pub mod auth {
    use super::*;
    use chrono::{Local, TimeZone};

    /// Authenticate and persist a session
    ///
    /// Missing credentials are asked for interactively.
    ///
    /// # Errors
    ///
    /// Returns error when the login is rejected or aborted
    pub async fn login(config: Config, nif: Option<String>, movil: Option<String>) -> Result<()> {
        let mut dispatcher = build_dispatcher(&config)?;

        let (nif, movil) = match (nif, movil) {
            (Some(nif), Some(movil)) => (nif, movil),
            (nif, movil) => {
                let mut rl = DefaultEditor::new()?;
                let nif = match nif {
                    Some(nif) => nif,
                    None => ask_line(&mut rl, "NIF: ")?.ok_or_else(login_aborted)?,
                };
                let movil = match movil {
                    Some(movil) => movil,
                    None => ask_line(&mut rl, "Móvil: ")?.ok_or_else(login_aborted)?,
                };
                (nif, movil)
            }
        };

        let outcome = dispatcher.authenticate(&nif, &movil).await;
        report_outcome(&outcome);
        match outcome {
            Outcome::LoggedIn(_) => Ok(()),
            Outcome::LoginFailed(e) => {
                Err(PaccChatError::AuthenticationRequired(e.message().to_string()).into())
            }
            _ => Ok(()),
        }
    }

    fn login_aborted() -> PaccChatError {
        PaccChatError::AuthenticationRequired("login aborted, no session stored".to_string())
    }

    /// Forget the stored session
    pub fn logout(config: Config) -> Result<()> {
        let sessions = SessionManager::new(open_store(&config.session)?);
        sessions.clear()?;
        println!("Sesión cerrada");
        Ok(())
    }

    /// Print whether a valid session is stored
    pub fn status(config: Config) -> Result<()> {
        let mut dispatcher = build_dispatcher(&config)?;
        match dispatcher.start() {
            Some(session) => {
                let expiry = Local
                    .timestamp_millis_opt(session.expiry)
                    .single()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| session.expiry.to_string());
                println!("Sesión activa hasta {}", expiry);
            }
            None => println!("Sin sesión. Use `pacc-chat login`."),
        }
        Ok(())
    }
}

// One-shot chat and directives
pub mod send {
    use super::*;

    fn require_session(dispatcher: &mut TerminalDispatcher) -> Result<()> {
        if dispatcher.start().is_none() {
            return Err(PaccChatError::AuthenticationRequired(
                "no valid session, run `pacc-chat login`".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Send a single message and print the reply
    pub async fn send_message(config: Config, text: String) -> Result<()> {
        let mut dispatcher = build_dispatcher(&config)?;
        require_session(&mut dispatcher)?;
        let outcome = dispatcher.submit_chat(&text).await;
        report_outcome(&outcome);
        Ok(())
    }

    /// Run a directive string
    pub async fn open_directive(config: Config, directive: String) -> Result<()> {
        let mut dispatcher = build_dispatcher(&config)?;
        require_session(&mut dispatcher)?;
        let outcome = dispatcher.invoke_directive(&directive).await;
        report_outcome(&outcome);
        match outcome {
            Outcome::LinkFailed(e) => Err(PaccChatError::Link(e).into()),
            _ => Ok(()),
        }
    }
}
