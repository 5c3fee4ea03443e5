//! CLI persistence backends for the core key-value seam.
//!
//! Secrets (token and user record) live in the OS keychain; everything else
//! (preferences, session bookkeeping, drafts) lives in a JSON file under the
//! data directory. [`CliStore`] routes between the two so the core sees one
//! uniform [`KeyValueStore`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use keyring::Entry;

use scribe_core::storage::{keys, KeyValueStore, StorageError, StorageResult};

const KEYRING_SERVICE_NAME: &str = "scribe-cli";

/// Keys that must never land in the plain file store.
fn is_secret_key(key: &str) -> bool {
    key == keys::TOKEN || key == keys::USER
}

/// Single-file JSON map store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    guard: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            guard: Arc::new(Mutex::new(())),
        }
    }

    fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(self.path.as_path()) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(StorageError::Backend(error.to_string())),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(error) => {
                // A mangled state file starts over; the next write repairs it.
                tracing::warn!(%error, path = %self.path.display(), "state file is corrupted, starting fresh");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| StorageError::Backend(error.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(map)?;
        std::fs::write(self.path.as_path(), raw)
            .map_err(|error| StorageError::Backend(error.to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// One keychain entry per key, under a fixed service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service, key).map_err(|error| StorageError::Backend(error.to_string()))
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(StorageError::Backend(error.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|error| StorageError::Backend(error.to_string()))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(StorageError::Backend(error.to_string())),
        }
    }
}

/// The CLI's composite store: keychain for secrets, file for the rest.
#[derive(Debug, Clone)]
pub struct CliStore {
    secure: KeyringStore,
    plain: JsonFileStore,
}

impl CliStore {
    #[must_use]
    pub fn new(secure: KeyringStore, plain: JsonFileStore) -> Self {
        Self { secure, plain }
    }

    /// Store rooted at the platform data directory.
    pub fn open_default() -> Self {
        Self::new(
            KeyringStore::new(KEYRING_SERVICE_NAME),
            JsonFileStore::new(default_state_path()),
        )
    }
}

impl KeyValueStore for CliStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if is_secret_key(key) {
            self.secure.get(key)
        } else {
            self.plain.get(key)
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if is_secret_key(key) {
            self.secure.set(key, value)
        } else {
            self.plain.set(key, value)
        }
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if is_secret_key(key) {
            self.secure.remove(key)
        } else {
            self.plain.remove(key)
        }
    }
}

fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scribe")
        .join("state.json")
}

/// State file path override for tests and scripting.
pub fn state_path_from_env() -> Option<PathBuf> {
    std::env::var_os("SCRIBE_STATE_PATH").map(PathBuf::from)
}

pub fn open_store() -> CliStore {
    match state_path_from_env() {
        Some(path) => CliStore::new(
            KeyringStore::new(KEYRING_SERVICE_NAME),
            JsonFileStore::new(path),
        ),
        None => CliStore::open_default(),
    }
}
