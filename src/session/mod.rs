//! Session token persistence
//!
//! A session is the pair (`userToken`, `userTokenExpiry`) kept in a
//! client-local [`KeyValueStore`]. The expiry is an epoch-millisecond
//! timestamp written as a decimal string. Sessions are checked once, when
//! the client starts; there is no renewal.
//!
//! # Examples
//!
//! ```
//! use pacc_chat::session::{MemoryStore, SessionManager, SESSION_DURATION_MS};
//!
//! let manager = SessionManager::new(Box::new(MemoryStore::new()));
//! let stored = manager.store("abc", 1_000).unwrap();
//! assert_eq!(stored.expiry, 1_000 + SESSION_DURATION_MS);
//!
//! let loaded = manager.load().unwrap();
//! assert_eq!(loaded.token, "abc");
//! assert!(loaded.is_valid_at(1_000));
//! ```

use crate::error::{PaccChatError, Result};
use serde::{Deserialize, Serialize};

pub mod clock;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{open_store, FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Storage key of the access token
pub const TOKEN_KEY: &str = "userToken";

/// Storage key of the expiry timestamp
pub const EXPIRY_KEY: &str = "userTokenExpiry";

/// Lifetime of a fresh session: two hours in milliseconds
pub const SESSION_DURATION_MS: i64 = 2 * 60 * 60 * 1000;

/// Longest session lifetime accepted from configuration: thirty days
pub const MAX_SESSION_DURATION_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Access token with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token issued by `/get-token`
    pub token: String,
    /// Expiry, epoch milliseconds
    pub expiry: i64,
}

impl Session {
    /// Builds a session from the raw stored strings
    ///
    /// Returns `None` when either value is missing, the token is empty, or
    /// the expiry is not a non-zero integer.
    pub fn from_stored(token: Option<String>, expiry: Option<String>) -> Option<Self> {
        let token = token.filter(|t| !t.is_empty())?;
        let expiry = expiry?.trim().parse::<i64>().ok().filter(|e| *e != 0)?;
        Some(Self { token, expiry })
    }

    /// True while `now` is strictly before the expiry
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expiry > now
    }

    /// Milliseconds left before expiry (zero once expired)
    pub fn remaining_ms(&self, now: i64) -> i64 {
        (self.expiry - now).max(0)
    }
}

/// True iff `session` is present and has not expired at `now`
///
/// # Examples
///
/// ```
/// use pacc_chat::session::{is_valid, Session};
///
/// let session = Session { token: "t".to_string(), expiry: 100 };
/// assert!(is_valid(Some(&session), 99));
/// assert!(!is_valid(Some(&session), 100));
/// assert!(!is_valid(None, 0));
/// ```
pub fn is_valid(session: Option<&Session>, now: i64) -> bool {
    session.map(|s| s.is_valid_at(now)).unwrap_or(false)
}

/// Reads, writes and clears the persisted session
pub struct SessionManager {
    store: Box<dyn KeyValueStore>,
    duration_ms: i64,
}

impl SessionManager {
    /// Creates a manager using the standard two-hour session lifetime
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_duration(store, SESSION_DURATION_MS)
    }

    /// Creates a manager with a custom session lifetime
    pub fn with_duration(store: Box<dyn KeyValueStore>, duration_ms: i64) -> Self {
        Self { store, duration_ms }
    }

    /// Lifetime given to freshly stored sessions
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Reads the stored session
    ///
    /// Missing or malformed fields yield `None`. Backend failures are logged
    /// and also yield `None`; nothing is modified.
    pub fn load(&self) -> Option<Session> {
        let read = || -> Result<(Option<String>, Option<String>)> {
            Ok((
                self.store.get_item(TOKEN_KEY)?,
                self.store.get_item(EXPIRY_KEY)?,
            ))
        };

        match read() {
            Ok((token, expiry)) => Session::from_stored(token, expiry),
            Err(e) => {
                tracing::warn!("Failed to read stored session: {}", e);
                None
            }
        }
    }

    /// Stores `token` with an expiry of `now + duration`, replacing any
    /// previous session
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry does not fit in an `i64` or the
    /// backend cannot be written
    pub fn store(&self, token: &str, now: i64) -> Result<Session> {
        let expiry = now.checked_add(self.duration_ms).ok_or_else(|| {
            PaccChatError::Storage(format!(
                "session expiry overflows: now={} duration_ms={}",
                now, self.duration_ms
            ))
        })?;
        let session = Session {
            token: token.to_string(),
            expiry,
        };
        self.store.set_item(TOKEN_KEY, &session.token)?;
        self.store
            .set_item(EXPIRY_KEY, &session.expiry.to_string())?;
        tracing::debug!("Stored session expiring at {}", session.expiry);
        Ok(session)
    }

    /// Removes both session fields
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(TOKEN_KEY)?;
        self.store.remove_item(EXPIRY_KEY)?;
        Ok(())
    }

    /// Startup check
    ///
    /// Returns the stored session when it is still valid at `now`. Otherwise
    /// any stale state is cleared and `None` is returned, meaning the caller
    /// must obtain a fresh credential before chatting.
    pub fn restore(&self, now: i64) -> Option<Session> {
        let session = self.load();
        if is_valid(session.as_ref(), now) {
            return session;
        }

        if session.is_some() {
            tracing::info!("Stored session expired, clearing it");
        }
        if let Err(e) = self.clear() {
            tracing::warn!("Failed to clear stale session: {}", e);
        }
        None
    }
}
