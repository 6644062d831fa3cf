//! pacc-chat - Terminal client for the PACC customer assistant
//!
//! This library provides the pieces of the chat front end: session
//! persistence, the remote API client, the dispatcher that gates every
//! interaction behind a valid session, and the renderers that show the
//! conversation.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Stored token and expiry, validity checks, storage backends
//! - `api`: Authentication and query calls against the chat API
//! - `dispatcher`: Login gate and request lifecycle for user intents
//! - `transcript`: Message model and the sinks that receive messages
//! - `render`: HTML handling and terminal output
//! - `directive`: Directive parsing, eCliente deep links, reply actions
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pacc_chat::{ApiClient, Config, Dispatcher, Intent, SessionManager, Transcript};
//! use pacc_chat::session::open_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let backend = ApiClient::new(&config.api, config.messages.clone())?;
//!     let sessions = SessionManager::new(open_store(&config.session)?);
//!     let mut dispatcher =
//!         Dispatcher::new(backend, sessions, Transcript::new(), &config.api.ecliente_url);
//!
//!     if dispatcher.start().is_none() {
//!         dispatcher
//!             .dispatch(Intent::SubmitLogin {
//!                 nif: "12345678z".into(),
//!                 movil: "600000000".into(),
//!             })
//!             .await;
//!     }
//!     dispatcher.dispatch(Intent::SubmitChat("Mis pólizas".into())).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod directive;
pub mod dispatcher;
pub mod error;
pub mod render;
pub mod session;
pub mod transcript;

// Re-export commonly used types
pub use api::{ApiClient, ChatBackend};
pub use config::Config;
pub use directive::{deep_link, extract_actions, Action, Directive};
pub use dispatcher::{Dispatcher, Intent, Outcome};
pub use error::{DispatchError, PaccChatError, Result};
pub use render::{HtmlPolicy, TerminalSink};
pub use session::{Session, SessionManager};
pub use transcript::{ChatMessage, MessageSink, Origin, Transcript};
