//! Typed accessors for the persisted app state that is neither a credential
//! nor a session: the preferences map, the recent-search list, and the note
//! draft autosave.

use serde::{Deserialize, Serialize};

use crate::models::NoteInput;
use crate::queries::{FilterState, SortKey, ViewMode};
use crate::storage::{keys, KeyValueStore, StorageResult};
use crate::util::unix_timestamp_ms;

/// Recent searches kept, most recent first.
pub const RECENT_SEARCHES_MAX: usize = 10;
/// Draft autosaves older than this are discarded on load.
pub const DRAFT_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Persisted view preferences (sort order, view mode, last-used filters).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub show_archived: bool,
    #[serde(default)]
    pub filters: FilterState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DraftRecord {
    input: NoteInput,
    saved_at: i64,
}

/// App-preference facade over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct AppPrefs<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> AppPrefs<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub fn preferences(&self) -> StorageResult<Preferences> {
        Ok(self
            .store
            .read_json(keys::PREFERENCES)?
            .unwrap_or_default())
    }

    pub fn set_preferences(&self, preferences: &Preferences) -> StorageResult<()> {
        self.store.write_json(keys::PREFERENCES, preferences)
    }

    /// Record a search query: trimmed, deduplicated, most recent first.
    pub fn record_search(&self, query: &str) -> StorageResult<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        let mut searches = self.recent_searches()?;
        searches.retain(|existing| !existing.eq_ignore_ascii_case(query));
        searches.insert(0, query.to_string());
        searches.truncate(RECENT_SEARCHES_MAX);
        self.store.write_json(keys::RECENT_SEARCHES, &searches)
    }

    pub fn recent_searches(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .store
            .read_json(keys::RECENT_SEARCHES)?
            .unwrap_or_default())
    }

    pub fn clear_recent_searches(&self) -> StorageResult<()> {
        self.store.remove(keys::RECENT_SEARCHES)
    }

    /// Autosave a draft with the current timestamp.
    pub fn save_draft(&self, input: &NoteInput) -> StorageResult<()> {
        let record = DraftRecord {
            input: input.clone(),
            saved_at: unix_timestamp_ms(),
        };
        self.store.write_json(keys::NOTE_DRAFT, &record)
    }

    /// Load the draft if one exists and has not expired; expired drafts are
    /// removed on the way out.
    pub fn load_draft(&self) -> StorageResult<Option<NoteInput>> {
        let Some(record) = self.store.read_json::<DraftRecord>(keys::NOTE_DRAFT)? else {
            return Ok(None);
        };
        if unix_timestamp_ms().saturating_sub(record.saved_at) > DRAFT_TTL_MS {
            tracing::debug!("discarding expired note draft");
            self.store.remove(keys::NOTE_DRAFT)?;
            return Ok(None);
        }
        Ok(Some(record.input))
    }

    pub fn clear_draft(&self) -> StorageResult<()> {
        self.store.remove(keys::NOTE_DRAFT)
    }
}
