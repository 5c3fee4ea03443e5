//! Key-value persistence seam.
//!
//! Everything Scribe persists locally (credentials, sessions, preferences,
//! drafts) goes through [`KeyValueStore`], so the backing mechanism is
//! swappable: in-memory for tests, keychain/file stores in the CLI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod prefs;

/// Logical names for every persisted piece of local state.
pub mod keys {
    pub const TOKEN: &str = "auth.token";
    pub const USER: &str = "auth.user";
    pub const REMEMBER_ME: &str = "auth.remember_me";
    pub const CURRENT_SESSION: &str = "session.current";
    pub const SESSION_HISTORY: &str = "session.history";
    pub const DEVICE_FINGERPRINT: &str = "device.fingerprint";
    pub const RECENT_SEARCHES: &str = "search.recent";
    pub const PREFERENCES: &str = "app.preferences";
    pub const NOTE_DRAFT: &str = "notes.draft";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Stored value is not valid JSON: {0}")]
    Corrupted(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for crate::error::Error {
    fn from(error: StorageError) -> Self {
        Self::Storage(error.to_string())
    }
}

/// String key-value persistence with typed JSON helpers.
///
/// `Clone` lets one logical store be shared by the credential store and the
/// session manager; implementations are expected to clone cheaply (handle
/// semantics).
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Read a JSON value. A corrupted entry is removed and reported as
    /// absent, so one bad write can never wedge the application.
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                tracing::warn!(key, %error, "removing corrupted stored value");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

/// In-memory store used by tests and embedders without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|error| StorageError::Backend(error.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
