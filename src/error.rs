//! Error types for pacc-chat
//!
//! Two families of errors live here. [`PaccChatError`] covers the
//! infrastructure (configuration, storage, keyring, HTTP client setup) and is
//! propagated with `?` through [`Result`]. [`DispatchError`] is the outcome of
//! a single user action against the remote API and is never fatal: its
//! display text is what the user gets to read.

use thiserror::Error;

/// Main error type for pacc-chat operations
#[derive(Error, Debug)]
pub enum PaccChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage errors (file or keyring backend)
    #[error("Storage error: {0}")]
    Storage(String),

    /// An interactive action was attempted before logging in
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Deep link could not be built or opened
    #[error("Link error: {0}")]
    Link(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Invalid URL in configuration or while building a link
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Terminal failure of a single request to the chat API
///
/// The display string is the message shown to the user, so both variants
/// format as their bare message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The server answered but did not deliver what was asked for.
    ///
    /// Holds the server-supplied `error` text, or a localized fallback.
    #[error("{0}")]
    Application(String),

    /// The request never produced a readable answer (network failure,
    /// unreadable body). Holds the fixed user-facing message; the underlying
    /// cause is logged where it happens.
    #[error("{0}")]
    Transport(String),
}

impl DispatchError {
    /// Returns the user-facing message
    pub fn message(&self) -> &str {
        match self {
            Self::Application(msg) | Self::Transport(msg) => msg,
        }
    }

    /// Returns true when the failure happened below the application layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for pacc-chat operations
pub type Result<T> = anyhow::Result<T>;
