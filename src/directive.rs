//! Directive parsing and eCliente deep links
//!
//! Bot replies can carry actions as `data-solicitud="scope#entity#id"`
//! attributes. A directive whose scope is `ecliente` and that has exactly
//! three parts opens the eCliente service for that record; any other string
//! is sent to the chat as if the user had typed it.

use crate::error::{PaccChatError, Result};
use crate::render::{decode_entities, html_to_text};
use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;
use url::Url;

/// Scope that turns a directive into a deep link
pub const ECLIENTE_SCOPE: &str = "ecliente";

/// Separator between directive parts
pub const DIRECTIVE_SEPARATOR: char = '#';

/// A parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Open `{ecliente_url}/access/{entity}/{token}/{id}`
    Ecliente {
        /// Kind of record (e.g. `clients`)
        entity: String,
        /// Record identifier
        id: String,
    },
    /// Submit the raw string as chat input
    Chat(String),
}

impl Directive {
    /// Parses a directive string
    ///
    /// Only an exact three-part split with the `ecliente` scope is a link;
    /// every other input, including malformed ones, falls back to chat text.
    ///
    /// # Examples
    ///
    /// ```
    /// use pacc_chat::directive::Directive;
    ///
    /// assert_eq!(
    ///     Directive::parse("ecliente#clients#42"),
    ///     Directive::Ecliente { entity: "clients".into(), id: "42".into() }
    /// );
    /// assert_eq!(
    ///     Directive::parse("ecliente#bad"),
    ///     Directive::Chat("ecliente#bad".into())
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(DIRECTIVE_SEPARATOR).collect();
        match parts.as_slice() {
            [scope, entity, id] if *scope == ECLIENTE_SCOPE => Self::Ecliente {
                entity: entity.to_string(),
                id: id.to_string(),
            },
            _ => Self::Chat(raw.to_string()),
        }
    }
}

/// Builds the eCliente access link for a record
///
/// Each segment is percent-encoded, so a `/` in the token stays inside its
/// segment as `%2F`.
///
/// # Errors
///
/// Returns an error if `base` is not a URL that can carry a path.
///
/// # Examples
///
/// ```
/// use pacc_chat::directive::deep_link;
///
/// let link = deep_link("https://ecliente.example.com", "clients", "T", "42").unwrap();
/// assert_eq!(link, "https://ecliente.example.com/access/clients/T/42");
/// ```
pub fn deep_link(base: &str, entity: &str, token: &str, id: &str) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| PaccChatError::Link(format!("{} cannot be used as a base URL", base)))?
        .pop_if_empty()
        .extend(["access", entity, token, id]);
    Ok(url.to_string())
}

/// Opens links in a new browsing context
pub trait LinkOpener: Send + Sync {
    /// Opens `url`
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens links with the platform's default browser
///
/// On platforms without a known launcher the link is only printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

/// Command that hands `url` to the platform's browser launcher
#[cfg(target_os = "macos")]
fn launcher(url: &str) -> Option<Command> {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    Some(cmd)
}

#[cfg(target_os = "linux")]
fn launcher(url: &str) -> Option<Command> {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    Some(cmd)
}

#[cfg(target_os = "windows")]
fn launcher(url: &str) -> Option<Command> {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    Some(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn launcher(_url: &str) -> Option<Command> {
    None
}

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let Some(mut cmd) = launcher(url) else {
            tracing::debug!("No browser launcher on this platform, printing {}", url);
            return PrintOpener.open(url);
        };

        let mut child = cmd.spawn()?;
        // Reap the launcher in the background so it does not linger as a zombie.
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                tracing::warn!("Browser launcher did not exit cleanly: {}", e);
            }
        });
        tracing::debug!("Opened {}", url);
        Ok(())
    }
}

/// Opener that only prints the link
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOpener;

impl LinkOpener for PrintOpener {
    fn open(&self, url: &str) -> Result<()> {
        println!("{}", url);
        Ok(())
    }
}

/// An action offered by a bot reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Visible text of the element carrying the directive
    pub label: String,
    /// Directive string from the `data-solicitud` attribute
    pub directive: String,
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)data-solicitud\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>([^<]*)"#)
            .expect("valid action regex")
    })
}

/// Collects the actions embedded in a bot reply, in document order
///
/// The label is the text directly inside the element; when that is empty
/// the directive itself is used.
///
/// # Examples
///
/// ```
/// use pacc_chat::directive::extract_actions;
///
/// let html = r#"<a data-solicitud="ecliente#polizas#7">Ver póliza</a>"#;
/// let actions = extract_actions(html);
/// assert_eq!(actions[0].label, "Ver póliza");
/// assert_eq!(actions[0].directive, "ecliente#polizas#7");
/// ```
pub fn extract_actions(html: &str) -> Vec<Action> {
    action_regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
            let directive = decode_entities(raw);
            if directive.is_empty() {
                return None;
            }
            let label = caps
                .get(3)
                .map(|m| html_to_text(m.as_str()))
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| directive.clone());
            Some(Action { label, directive })
        })
        .collect()
}
