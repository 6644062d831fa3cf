//! Client-local key/value storage backends
//!
//! Sessions are kept the way a browser keeps them in local storage: a flat
//! map of string keys to string values. [`KeyValueStore`] is that surface;
//! the backends decide where the strings end up.

use crate::config::{SessionConfig, StoreKind};
use crate::error::{PaccChatError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Keyring service name under which every key is stored
const KEYRING_SERVICE: &str = "pacc-chat";

/// File name of the session file inside the data directory
const SESSION_FILE_NAME: &str = "session.json";

/// String key/value storage with local-storage semantics
///
/// Setting a key overwrites any previous value; removing a missing key is a
/// no-op.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Opens the backend selected by the session configuration
///
/// # Errors
///
/// Returns an error if the file backend has no usable data directory.
pub fn open_store(config: &SessionConfig) -> Result<Box<dyn KeyValueStore>> {
    let store: Box<dyn KeyValueStore> = match config.store {
        StoreKind::File => {
            let path = match &config.path {
                Some(path) => PathBuf::from(path),
                None => default_session_path()?,
            };
            tracing::debug!("Using session file {}", path.display());
            Box::new(FileStore::new(path))
        }
        StoreKind::Keyring => {
            tracing::debug!("Using OS keyring for session storage");
            Box::new(KeyringStore::new())
        }
        StoreKind::Memory => {
            tracing::debug!("Using in-memory session storage");
            Box::new(MemoryStore::new())
        }
    };
    Ok(store)
}

/// Default location of the session file in the user's data directory
pub fn default_session_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "pacc", "pacc-chat")
        .ok_or_else(|| PaccChatError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join(SESSION_FILE_NAME))
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store
///
/// Clones share the same map, so a test can keep a handle and inspect what a
/// [`SessionManager`](super::SessionManager) wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or_default()
    }

    /// Returns true when no key is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| PaccChatError::Storage("memory store lock poisoned".to_string()).into())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// JSON object file holding all keys
///
/// The file is rewritten on every change and removed once the last key is
/// gone.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by `path`; the file is created lazily
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
            .map_err(|e| PaccChatError::Storage(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let map = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed session file {}", self.path.display()))
            .map_err(|e| PaccChatError::Storage(e.to_string()))?;
        Ok(map)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if map.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)
                    .context("Failed to remove session file")
                    .map_err(|e| PaccChatError::Storage(e.to_string()))?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for session file")
                .map_err(|e| PaccChatError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
            .map_err(|e| PaccChatError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable session file: {}", e);
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Discarding unreadable session file: {}", e);
                BTreeMap::new()
            }
        };
        map.remove(key);
        self.write_map(&map)
    }
}

// ---------------------------------------------------------------------------
// KeyringStore
// ---------------------------------------------------------------------------

/// OS keyring backend (Keychain, Secret Service, Credential Manager)
///
/// Each key becomes one entry under the `pacc-chat` service.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates a store under the default service name
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Creates a store under a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(|e| PaccChatError::Keyring(e).into())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(PaccChatError::Keyring(e).into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(PaccChatError::Keyring)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(PaccChatError::Keyring(e).into()),
        }
    }
}
