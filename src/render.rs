//! Terminal rendering of the chat log
//!
//! Bot replies arrive as HTML the server considers trusted. Whether that
//! markup reaches the output untouched is a policy decision, made explicit by
//! [`HtmlPolicy`]; the terminal defaults to plain text.

use crate::error::{PaccChatError, Result};
use crate::transcript::{play_cue, ChatMessage, MessageSink, Notifier, Origin};
use colored::Colorize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::OnceLock;

/// What to do with markup in bot replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlPolicy {
    /// Pass the server's markup through unchanged
    Raw,
    /// Strip tags and decode common entities
    #[default]
    Text,
}

impl HtmlPolicy {
    /// Parse a policy from a string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use pacc_chat::render::HtmlPolicy;
    ///
    /// assert_eq!(HtmlPolicy::parse_str("RAW").unwrap(), HtmlPolicy::Raw);
    /// assert!(HtmlPolicy::parse_str("sanitize").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "text" => Ok(Self::Text),
            other => Err(format!(
                "Invalid HTML policy: {}. Must be one of: raw, text",
                other
            )),
        }
    }

    /// Applies the policy to a message body
    pub fn apply(&self, body: &str) -> String {
        match self {
            Self::Raw => body.to_string(),
            Self::Text => html_to_text(body),
        }
    }
}

impl fmt::Display for HtmlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Text => write!(f, "text"),
        }
    }
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])\s*>").expect("valid line break regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"))
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid blank line regex"))
}

/// Converts an HTML fragment to readable plain text
///
/// # Examples
///
/// ```
/// use pacc_chat::render::html_to_text;
///
/// assert_eq!(html_to_text("<b>Hola</b><br>mundo &amp; co"), "Hola\nmundo & co");
/// ```
pub fn html_to_text(html: &str) -> String {
    let with_breaks = line_break_regex().replace_all(html, "\n");
    let stripped = tag_regex().replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    let collapsed = blank_lines_regex().replace_all(&decoded, "\n");
    collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub(crate) fn decode_entities(text: &str) -> String {
    // `&amp;` last so that `&amp;lt;` stays `&lt;`.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Rings the terminal bell
#[derive(Debug, Clone, Copy, Default)]
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn notify(&self) -> Result<()> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07").map_err(PaccChatError::Io)?;
        out.flush().map_err(PaccChatError::Io)?;
        Ok(())
    }
}

/// Sink printing the chat log to a terminal
///
/// The pending placeholder is drawn on its own unterminated line so it can be
/// erased in place once the reply arrives.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    policy: HtmlPolicy,
    notifier: Option<Box<dyn Notifier>>,
    pending_visible: bool,
    rendered: Vec<ChatMessage>,
}

impl TerminalSink<std::io::Stdout> {
    /// Sink on stdout, ringing the bell for replies when `sound` is set
    pub fn stdout(policy: HtmlPolicy, sound: bool) -> Self {
        let notifier: Option<Box<dyn Notifier>> = if sound {
            Some(Box::new(BellNotifier))
        } else {
            None
        };
        Self::new(std::io::stdout(), policy, notifier)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    /// Sink writing to `out`
    pub fn new(out: W, policy: HtmlPolicy, notifier: Option<Box<dyn Notifier>>) -> Self {
        Self {
            out,
            policy,
            notifier,
            pending_visible: false,
            rendered: Vec::new(),
        }
    }

    /// Completed messages rendered so far
    pub fn history(&self) -> &[ChatMessage] {
        &self.rendered
    }

    /// Newest completed bot message
    pub fn last_bot_message(&self) -> Option<&ChatMessage> {
        self.rendered.iter().rev().find(|m| m.origin == Origin::Bot)
    }

    /// Consumes the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_message(&mut self, message: &ChatMessage) -> std::io::Result<()> {
        if message.pending {
            write!(self.out, "{}", format!("bot: {}", message.body).dimmed())?;
            self.pending_visible = true;
            return self.out.flush();
        }

        match message.origin {
            Origin::User => writeln!(self.out, "{} {}", "you:".cyan().bold(), message.body)?,
            Origin::Bot => {
                let body = self.policy.apply(&message.body);
                writeln!(self.out, "{}\n{}\n", "bot:".green().bold(), body)?
            }
        }
        self.out.flush()
    }

    fn erase_pending(&mut self) -> std::io::Result<()> {
        if self.pending_visible {
            write!(self.out, "\r\x1b[2K")?;
            self.pending_visible = false;
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> MessageSink for TerminalSink<W> {
    fn append(&mut self, message: ChatMessage) {
        if !message.pending {
            // A message printed after an uncleared placeholder starts on a fresh line.
            if let Err(e) = self.erase_pending() {
                tracing::warn!("Failed to clear pending line: {}", e);
            }
        }
        if let Err(e) = self.write_message(&message) {
            tracing::warn!("Failed to render chat message: {}", e);
        }
        if message.wants_notification() {
            if let Some(notifier) = &self.notifier {
                play_cue(notifier.as_ref());
            }
        }
        if !message.pending {
            self.rendered.push(message);
        }
    }

    fn remove_pending(&mut self) {
        if let Err(e) = self.erase_pending() {
            tracing::warn!("Failed to clear pending line: {}", e);
        }
    }
}
