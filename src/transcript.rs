//! Chat log model and the rendering seam
//!
//! The dispatcher never draws anything itself. It hands [`ChatMessage`]s to a
//! [`MessageSink`], which keeps them in order and shows them somehow. The
//! in-memory [`Transcript`] is the reference sink; the terminal one lives in
//! [`crate::render`].

use crate::error::Result;
use std::fmt;

/// Placeholder body shown while a reply is outstanding
pub const PENDING_BODY: &str = "...";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Typed or triggered by the local user
    User,
    /// Produced by the assistant (or an error shown in its place)
    Bot,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

/// One entry of the visible log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author
    pub origin: Origin,
    /// Text; bot bodies are server-provided HTML
    pub body: String,
    /// True for the placeholder shown while waiting for a reply
    pub pending: bool,
}

impl ChatMessage {
    /// A message typed by the user
    pub fn user(body: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            body: body.into(),
            pending: false,
        }
    }

    /// A completed bot message
    pub fn bot(body: impl Into<String>) -> Self {
        Self {
            origin: Origin::Bot,
            body: body.into(),
            pending: false,
        }
    }

    /// The "thinking" placeholder
    pub fn pending() -> Self {
        Self {
            origin: Origin::Bot,
            body: PENDING_BODY.to_string(),
            pending: true,
        }
    }

    /// True for completed bot messages, the ones that deserve a cue
    pub fn wants_notification(&self) -> bool {
        self.origin == Origin::Bot && !self.pending
    }
}

/// Where chat messages are rendered
pub trait MessageSink: Send {
    /// Appends `message` at the end of the log and brings it into view
    fn append(&mut self, message: ChatMessage);

    /// Removes every pending placeholder from the log
    fn remove_pending(&mut self);
}

/// Notification cue for new bot replies
pub trait Notifier: Send + Sync {
    /// Plays the cue once
    fn notify(&self) -> Result<()>;
}

/// Plays the cue, logging instead of failing
pub fn play_cue(notifier: &dyn Notifier) {
    if let Err(e) = notifier.notify() {
        tracing::warn!("Could not play notification cue: {}", e);
    }
}

/// In-memory chat log
#[derive(Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    notifier: Option<Box<dyn Notifier>>,
    cues: usize,
}

impl Transcript {
    /// Creates an empty log without a notification cue
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log that plays `notifier` for bot replies
    pub fn with_notifier(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
            ..Self::default()
        }
    }

    /// Messages in display order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages from `origin` that are not placeholders
    pub fn completed(&self, origin: Origin) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.origin == origin && !m.pending)
            .collect()
    }

    /// Number of placeholders currently shown
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }

    /// Body of the newest message
    pub fn last_body(&self) -> Option<&str> {
        self.messages.last().map(|m| m.body.as_str())
    }

    /// How many cues were attempted
    pub fn cues(&self) -> usize {
        self.cues
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("cues", &self.cues)
            .finish()
    }
}

impl MessageSink for Transcript {
    fn append(&mut self, message: ChatMessage) {
        if message.wants_notification() {
            self.cues += 1;
            if let Some(notifier) = &self.notifier {
                play_cue(notifier.as_ref());
            }
        }
        self.messages.push(message);
    }

    fn remove_pending(&mut self) {
        self.messages.retain(|m| !m.pending);
    }
}
