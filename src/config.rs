//! Configuration management for pacc-chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PaccChatError, Result};
use crate::render::HtmlPolicy;
use crate::session::{MAX_SESSION_DURATION_MS, SESSION_DURATION_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for pacc-chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API endpoints and identifying headers
    #[serde(default)]
    pub api: ApiConfig,
    /// Where and how long the session token is kept
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat rendering behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// User-facing fallback messages
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat API (`/get-token` and `/consulta` live under it)
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Base URL of the eCliente service targeted by deep links
    #[serde(default = "default_ecliente_url")]
    pub ecliente_url: String,

    /// Tenant tag sent in the `Empresa` header
    #[serde(default = "default_empresa")]
    pub empresa: String,

    /// Device tag sent in the `Device` header
    #[serde(default = "default_device")]
    pub device: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_ecliente_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_empresa() -> String {
    "pacc".to_string()
}

fn default_device() -> String {
    "web".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            ecliente_url: default_ecliente_url(),
            empresa: default_empresa(),
            device: default_device(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Session storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON file in the user's data directory
    #[default]
    File,
    /// OS native credential store
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl StoreKind {
    /// Parse a store kind from a string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use pacc_chat::config::StoreKind;
    ///
    /// assert_eq!(StoreKind::parse_str("Keyring").unwrap(), StoreKind::Keyring);
    /// assert!(StoreKind::parse_str("redis").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "Invalid session store: {}. Must be one of: file, keyring, memory",
                other
            )),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend holding `userToken` / `userTokenExpiry`
    #[serde(default)]
    pub store: StoreKind,

    /// Override path for the file backend
    #[serde(default)]
    pub path: Option<String>,

    /// Lifetime of a fresh session in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: i64,
}

fn default_duration_ms() -> i64 {
    SESSION_DURATION_MS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            path: None,
            duration_ms: default_duration_ms(),
        }
    }
}

/// Chat rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How bot replies (server-provided HTML) are rendered
    #[serde(default)]
    pub html_policy: HtmlPolicy,

    /// Ring the terminal bell when a bot reply arrives
    #[serde(default = "default_true")]
    pub notification_sound: bool,

    /// Launch the system browser for eCliente deep links
    #[serde(default = "default_true")]
    pub open_links: bool,

    /// Preset prompts offered as numbered quick replies
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            html_policy: HtmlPolicy::default(),
            notification_sound: true,
            open_links: true,
            quick_replies: Vec::new(),
        }
    }
}

/// Fallback texts shown when the server does not supply one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Login rejected without a server message
    #[serde(default = "default_auth_failed")]
    pub auth_failed: String,

    /// Login request could not reach the server
    #[serde(default = "default_auth_connection")]
    pub auth_connection: String,

    /// Chat reply missing without a server message
    #[serde(default = "default_chat_failed")]
    pub chat_failed: String,

    /// Chat request could not reach the server
    #[serde(default = "default_chat_connection")]
    pub chat_connection: String,
}

fn default_auth_failed() -> String {
    "Error al autenticar".to_string()
}

fn default_auth_connection() -> String {
    "Error de conexión".to_string()
}

fn default_chat_failed() -> String {
    "Error en la respuesta del servidor".to_string()
}

fn default_chat_connection() -> String {
    "Error de conexión con el servidor".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            auth_failed: default_auth_failed(),
            auth_connection: default_auth_connection(),
            chat_failed: default_chat_failed(),
            chat_connection: default_chat_connection(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PaccChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PaccChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // The bare names are what the web build injected; the prefixed ones win.
        for key in ["API_URL", "PACC_API_URL"] {
            if let Ok(url) = std::env::var(key) {
                self.api.url = url;
            }
        }

        for key in ["ECLIENTE_URL", "PACC_ECLIENTE_URL"] {
            if let Ok(url) = std::env::var(key) {
                self.api.ecliente_url = url;
            }
        }

        if let Ok(store) = std::env::var("PACC_CHAT_STORE") {
            match StoreKind::parse_str(&store) {
                Ok(kind) => self.session.store = kind,
                Err(e) => tracing::warn!("Ignoring PACC_CHAT_STORE: {}", e),
            }
        }

        if let Ok(path) = std::env::var("PACC_CHAT_SESSION_FILE") {
            self.session.path = Some(path);
        }

        if let Ok(timeout) = std::env::var("PACC_CHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid PACC_CHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(policy) = std::env::var("PACC_CHAT_HTML_POLICY") {
            match HtmlPolicy::parse_str(&policy) {
                Ok(p) => self.chat.html_policy = p,
                Err(e) => tracing::warn!("Ignoring PACC_CHAT_HTML_POLICY: {}", e),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.api_url {
            self.api.url = url.clone();
        }
        if let Some(url) = &cli.ecliente_url {
            self.api.ecliente_url = url.clone();
        }
        if cli.ephemeral {
            self.session.store = StoreKind::Memory;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api.url", &self.api.url),
            ("api.ecliente_url", &self.api.ecliente_url),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                PaccChatError::Config(format!("{} is not a valid URL ({}): {}", name, value, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PaccChatError::Config(format!(
                    "{} must use http or https, got {}",
                    name,
                    parsed.scheme()
                ))
                .into());
            }
        }

        if self.api.empresa.trim().is_empty() {
            return Err(PaccChatError::Config("api.empresa cannot be empty".to_string()).into());
        }

        if self.api.device.trim().is_empty() {
            return Err(PaccChatError::Config("api.device cannot be empty".to_string()).into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(PaccChatError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.duration_ms <= 0 {
            return Err(PaccChatError::Config(
                "session.duration_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.duration_ms > MAX_SESSION_DURATION_MS {
            return Err(PaccChatError::Config(format!(
                "session.duration_ms must be at most {} (30 days)",
                MAX_SESSION_DURATION_MS
            ))
            .into());
        }

        Ok(())
    }
}
