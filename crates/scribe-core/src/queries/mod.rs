//! Derived view selectors over the note collection.
//!
//! Pure computation only: nothing in here mutates a note. The store owns the
//! canonical collection and a revision counter; [`ViewCache`] memoizes the
//! expensive pipelines keyed by that revision plus the view inputs, so a
//! change to unrelated state never triggers a recompute.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Note, Priority};
use crate::util::unix_timestamp_ms;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Sort key for the note list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Title,
    Priority,
    UpdatedAt,
    Category,
}

/// How the collection is presented; persisted as a preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Active filter criteria. `None` means "All" for the concrete filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl FilterState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.category.is_none()
            && self.priority.is_none()
            && self.tag.is_none()
    }
}

/// Partition by archived flag: the view shows either archived or active notes.
#[must_use]
pub fn active_notes(notes: &[Note], show_archived: bool) -> Vec<Note> {
    notes
        .iter()
        .filter(|note| note.archived == show_archived)
        .cloned()
        .collect()
}

/// Conjunctive filtering over the active partition.
///
/// Free text matches case-insensitively against title, content, and tags;
/// category/priority/tag filters are exact matches when set.
#[must_use]
pub fn filtered_notes(notes: &[Note], filters: &FilterState, show_archived: bool) -> Vec<Note> {
    let query = filters.search.trim().to_lowercase();
    notes
        .iter()
        .filter(|note| note.archived == show_archived)
        .filter(|note| matches_search(note, &query))
        .filter(|note| {
            filters
                .category
                .as_ref()
                .map_or(true, |category| note.category == *category)
        })
        .filter(|note| {
            filters
                .priority
                .map_or(true, |priority| note.priority == priority)
        })
        .filter(|note| {
            filters
                .tag
                .as_ref()
                .map_or(true, |tag| note.tags.iter().any(|candidate| candidate == tag))
        })
        .cloned()
        .collect()
}

fn matches_search(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(query)
        || note.content.to_lowercase().contains(query)
        || note.tags.iter().any(|tag| tag.to_lowercase().contains(query))
}

/// Filter then stable-sort.
///
/// The default created-at sort puts pinned notes ahead of unpinned ones and
/// orders each partition newest-first; the remaining keys order purely by
/// their own criterion.
#[must_use]
pub fn sorted_notes(
    notes: &[Note],
    filters: &FilterState,
    sort: SortKey,
    show_archived: bool,
) -> Vec<Note> {
    let mut selected = filtered_notes(notes, filters, show_archived);
    sort_in_place(&mut selected, sort);
    selected
}

fn sort_in_place(notes: &mut [Note], sort: SortKey) {
    match sort {
        SortKey::CreatedAt => notes.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        SortKey::Title => notes.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Priority => {
            notes.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
        }
        SortKey::UpdatedAt => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        SortKey::Category => {
            notes.sort_by(|a, b| a.category.to_lowercase().cmp(&b.category.to_lowercase()));
        }
    }
}

/// Aggregate counters for the stats panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
    pub pinned: usize,
    pub by_category: BTreeMap<String, usize>,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub created_last_week: usize,
    pub updated_last_week: usize,
}

/// Compute stats over the whole collection (active and archived alike).
///
/// "Updated last week" excludes notes never touched after creation.
#[must_use]
pub fn notes_stats(notes: &[Note], now_ms: i64) -> NoteStats {
    let mut stats = NoteStats {
        total: notes.len(),
        ..NoteStats::default()
    };
    let week_ago = now_ms - WEEK_MS;

    for note in notes {
        if note.archived {
            stats.archived += 1;
        } else {
            stats.active += 1;
        }
        if note.pinned {
            stats.pinned += 1;
        }
        *stats.by_category.entry(note.category.clone()).or_default() += 1;
        match note.priority {
            Priority::High => stats.high_priority += 1,
            Priority::Medium => stats.medium_priority += 1,
            Priority::Low => stats.low_priority += 1,
        }
        if note.created_at >= week_ago {
            stats.created_last_week += 1;
        }
        if note.updated_at >= week_ago && note.updated_at != note.created_at {
            stats.updated_last_week += 1;
        }
    }

    stats
}

/// Deduplicated, alphabetically sorted union of every note's tags.
#[must_use]
pub fn all_tags(notes: &[Note]) -> Vec<String> {
    let mut tags = std::collections::BTreeSet::new();
    for note in notes {
        for tag in &note.tags {
            tags.insert(tag.clone());
        }
    }
    tags.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedViewKey {
    revision: u64,
    filters: FilterState,
    sort: SortKey,
    show_archived: bool,
}

/// Memoization cache for the derived views.
///
/// Keyed by the store's collection revision plus the view inputs; a hit
/// returns the shared `Arc` without recomputing.
#[derive(Debug, Default)]
pub struct ViewCache {
    sorted: Option<(SortedViewKey, Arc<Vec<Note>>)>,
    tags: Option<(u64, Arc<Vec<String>>)>,
    stats: Option<(u64, NoteStats)>,
}

impl ViewCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_notes(
        &mut self,
        revision: u64,
        notes: &[Note],
        filters: &FilterState,
        sort: SortKey,
        show_archived: bool,
    ) -> Arc<Vec<Note>> {
        let key = SortedViewKey {
            revision,
            filters: filters.clone(),
            sort,
            show_archived,
        };
        if let Some((cached_key, cached)) = &self.sorted {
            if *cached_key == key {
                return Arc::clone(cached);
            }
        }
        tracing::debug!(revision, "recomputing sorted note view");
        let computed = Arc::new(sorted_notes(notes, filters, sort, show_archived));
        self.sorted = Some((key, Arc::clone(&computed)));
        computed
    }

    pub fn all_tags(&mut self, revision: u64, notes: &[Note]) -> Arc<Vec<String>> {
        if let Some((cached_revision, cached)) = &self.tags {
            if *cached_revision == revision {
                return Arc::clone(cached);
            }
        }
        let computed = Arc::new(all_tags(notes));
        self.tags = Some((revision, Arc::clone(&computed)));
        computed
    }

    pub fn notes_stats(&mut self, revision: u64, notes: &[Note]) -> NoteStats {
        if let Some((cached_revision, cached)) = &self.stats {
            if *cached_revision == revision {
                return cached.clone();
            }
        }
        let computed = notes_stats(notes, unix_timestamp_ms());
        self.stats = Some((revision, computed.clone()));
        computed
    }
}
