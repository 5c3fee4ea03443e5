//! Note store with optimistic mutations.
//!
//! The store owns the in-memory collection and applies local mutations
//! immediately, before the corresponding network call resolves. Every
//! mutating operation walks the same per-note lifecycle:
//!
//! ```text
//! stable -> pending (optimistic) -> { confirmed, rolled-back }
//! ```
//!
//! A pre-mutation snapshot is captured before the optimistic write so a
//! failure restores the exact prior entry, and a monotonic version counter
//! per note id rejects out-of-order rollbacks: a stale failure can never
//! clobber a later confirmation. Rollback always happens before the error is
//! surfaced, so readers never observe a half-failed collection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::api::NotesApi;
use crate::error::{Error, Result};
use crate::models::{Note, NoteInput};
use crate::notify::{ActionCommand, NotificationAction, Notifier};
use crate::queries::{FilterState, NoteStats, SortKey, ViewCache, ViewMode};
use crate::util::unix_timestamp_ms;

/// Per-id outcome of a bulk operation. Sub-operations are independent:
/// failures roll back their own note only and never undo the successes.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl BulkOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// State container for the note collection and its view settings.
///
/// All mutations go through the methods here; reads are free. The container
/// is owned by the application root and injected where needed.
pub struct NoteStore<A: NotesApi> {
    api: A,
    token: String,
    notifier: Notifier,
    notes: Vec<Note>,
    loading: bool,
    last_error: Option<String>,
    filters: FilterState,
    sort_by: SortKey,
    view_mode: ViewMode,
    show_archived: bool,
    revision: u64,
    versions: HashMap<String, u64>,
}

impl<A: NotesApi> NoteStore<A> {
    pub fn new(api: A, token: impl Into<String>, notifier: Notifier) -> Self {
        Self {
            api,
            token: token.into(),
            notifier,
            notes: Vec::new(),
            loading: false,
            last_error: None,
            filters: FilterState::default(),
            sort_by: SortKey::default(),
            view_mode: ViewMode::default(),
            show_archived: false,
            revision: 0,
            versions: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Monotonic counter bumped on every collection change; the view cache
    /// keys on it.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[must_use]
    pub fn sort_by(&self) -> SortKey {
        self.sort_by
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    #[must_use]
    pub fn show_archived(&self) -> bool {
        self.show_archived
    }

    pub fn sorted_view(&self, cache: &mut ViewCache) -> Arc<Vec<Note>> {
        cache.sorted_notes(
            self.revision,
            &self.notes,
            &self.filters,
            self.sort_by,
            self.show_archived,
        )
    }

    pub fn stats_view(&self, cache: &mut ViewCache) -> NoteStats {
        cache.notes_stats(self.revision, &self.notes)
    }

    pub fn tags_view(&self, cache: &mut ViewCache) -> Arc<Vec<String>> {
        cache.all_tags(self.revision, &self.notes)
    }

    // ------------------------------------------------------------------
    // View settings: never touch the entities, so no revision bump
    // ------------------------------------------------------------------

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
    }

    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.filters.category = category;
    }

    pub fn set_priority_filter(&mut self, priority: Option<crate::models::Priority>) {
        self.filters.priority = priority;
    }

    pub fn set_tag_filter(&mut self, tag: Option<String>) {
        self.filters.tag = tag;
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort_by = sort;
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    pub fn set_show_archived(&mut self, show_archived: bool) {
        self.show_archived = show_archived;
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Fetch the collection for the current archived-visibility setting.
    pub async fn load(&mut self) -> Result<()> {
        self.loading = true;
        match self.api.list_notes(&self.token, self.show_archived).await {
            Ok(notes) => {
                self.loading = false;
                self.notes = notes;
                self.last_error = None;
                self.bump_revision();
                tracing::info!(count = self.notes.len(), "loaded notes");
                Ok(())
            }
            Err(error) => {
                self.loading = false;
                Err(self.fail(error))
            }
        }
    }

    /// Optimistically insert a placeholder under a `temp-` id, then replace
    /// it in the same slot with the server note, or remove it on failure.
    pub async fn create(&mut self, input: NoteInput) -> Result<Note> {
        let input = input.normalized();
        if let Err(error) = input.validate() {
            return Err(self.fail(error));
        }

        let placeholder = Note::local(&input);
        let temp_id = placeholder.id.clone();
        self.notes.insert(0, placeholder);
        self.bump_revision();
        let version = self.begin_op(&temp_id);

        match self.api.create_note(&self.token, &input).await {
            Ok(confirmed) => {
                match self.position(&temp_id) {
                    Some(index) => self.notes[index] = confirmed.clone(),
                    None => self.notes.insert(0, confirmed.clone()),
                }
                self.bump_revision();
                self.finish_op(&temp_id, version);
                self.last_error = None;
                self.notifier.success("Note created");
                tracing::info!(id = %confirmed.id, "note created");
                Ok(confirmed)
            }
            Err(error) => {
                if self.op_is_current(&temp_id, version) {
                    if let Some(index) = self.position(&temp_id) {
                        self.notes.remove(index);
                        self.bump_revision();
                    }
                }
                self.finish_op(&temp_id, version);
                Err(self.fail(error))
            }
        }
    }

    /// Optimistically overwrite the entry in place, restoring the captured
    /// snapshot if the server rejects the write.
    pub async fn update(&mut self, id: &str, input: NoteInput) -> Result<Note> {
        let input = input.normalized();
        if let Err(error) = input.validate() {
            return Err(self.fail(error));
        }
        let Some(index) = self.position(id) else {
            return Err(self.fail(Error::NotFound(id.to_string())));
        };

        let snapshot = self.notes[index].clone();
        self.notes[index].apply_input(&input);
        self.bump_revision();
        let version = self.begin_op(id);

        match self.api.update_note(&self.token, id, &input).await {
            Ok(confirmed) => {
                if let Some(index) = self.position(id) {
                    self.notes[index] = confirmed.clone();
                    self.bump_revision();
                }
                self.finish_op(id, version);
                self.last_error = None;
                self.notifier.success("Note updated");
                Ok(confirmed)
            }
            Err(error) => {
                if self.op_is_current(id, version) {
                    if let Some(index) = self.position(id) {
                        self.notes[index] = snapshot;
                        self.bump_revision();
                    }
                }
                self.finish_op(id, version);
                Err(self.fail(error))
            }
        }
    }

    /// Optimistically remove the entry; reinsert it at its old position on
    /// failure. On success the returned snapshot doubles as the undo
    /// payload, and the notification carries an undo action.
    pub async fn delete(&mut self, id: &str) -> Result<Note> {
        let Some(index) = self.position(id) else {
            return Err(self.fail(Error::NotFound(id.to_string())));
        };

        let snapshot = self.notes.remove(index);
        self.bump_revision();
        let version = self.begin_op(id);

        match self.api.delete_note(&self.token, id).await {
            Ok(()) => {
                self.finish_op(id, version);
                self.last_error = None;
                self.notifier.success_with_action(
                    "Note deleted",
                    NotificationAction {
                        label: "Undo".to_string(),
                        command: ActionCommand::UndoDelete(NoteInput::from(&snapshot)),
                    },
                );
                tracing::info!(%id, "note deleted");
                Ok(snapshot)
            }
            Err(error) => {
                if self.op_is_current(id, version) {
                    let at = index.min(self.notes.len());
                    self.notes.insert(at, snapshot);
                    self.bump_revision();
                }
                self.finish_op(id, version);
                Err(self.fail(error))
            }
        }
    }

    /// Recreate a deleted note from its field values. Not a restore: the
    /// note comes back under a fresh identity.
    pub async fn undo_delete(&mut self, deleted: &Note) -> Result<Note> {
        self.create(NoteInput::from(deleted)).await
    }

    /// No optimistic flip: the confirmed server entity is applied by
    /// id-match on success; on failure nothing local changed.
    pub async fn set_archived(&mut self, id: &str, archived: bool) -> Result<Note> {
        match self.api.set_archived(&self.token, id, archived).await {
            Ok(confirmed) => {
                self.apply_confirmed(&confirmed);
                self.last_error = None;
                Ok(confirmed)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Same contract as [`Self::set_archived`].
    pub async fn set_pinned(&mut self, id: &str, pinned: bool) -> Result<Note> {
        match self.api.set_pinned(&self.token, id, pinned).await {
            Ok(confirmed) => {
                self.apply_confirmed(&confirmed);
                self.last_error = None;
                Ok(confirmed)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Flip the archived flag optimistically per id, then confirm each over
    /// its own request. One aggregate notification on any failure.
    pub async fn bulk_archive(&mut self, ids: &[String], archived: bool) -> BulkOutcome {
        let mut pending: Vec<(String, Note, u64)> = Vec::new();
        for id in ids {
            if let Some(index) = self.position(id) {
                let snapshot = self.notes[index].clone();
                self.notes[index].archived = archived;
                self.notes[index].updated_at = unix_timestamp_ms();
                let version = self.begin_op(id);
                pending.push((id.clone(), snapshot, version));
            }
        }
        if pending.is_empty() {
            return BulkOutcome::default();
        }
        self.bump_revision();

        let mut calls = JoinSet::new();
        for (id, _, _) in &pending {
            let api = self.api.clone();
            let token = self.token.clone();
            let id = id.clone();
            calls.spawn(async move {
                let result = api.set_archived(&token, &id, archived).await.map(Some);
                (id, result)
            });
        }

        let outcome = self.collect_bulk(calls, &pending).await;
        self.report_bulk(&outcome, if archived { "archive" } else { "unarchive" });
        outcome
    }

    /// Optimistically remove each id, then confirm each over its own
    /// request; failed removals are reinserted, successes stay removed.
    pub async fn bulk_delete(&mut self, ids: &[String]) -> BulkOutcome {
        let mut pending: Vec<(String, Note, u64)> = Vec::new();
        for id in ids {
            if let Some(index) = self.position(id) {
                let snapshot = self.notes.remove(index);
                let version = self.begin_op(id);
                pending.push((id.clone(), snapshot, version));
            }
        }
        if pending.is_empty() {
            return BulkOutcome::default();
        }
        self.bump_revision();

        let mut calls = JoinSet::new();
        for (id, _, _) in &pending {
            let api = self.api.clone();
            let token = self.token.clone();
            let id = id.clone();
            calls.spawn(async move {
                let result = api.delete_note(&token, &id).await.map(|()| None);
                (id, result)
            });
        }

        let outcome = self.collect_bulk(calls, &pending).await;
        self.report_bulk(&outcome, "delete");
        outcome
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Drain bulk sub-operation results, applying confirmations and rolling
    /// back failures independently per id.
    async fn collect_bulk(
        &mut self,
        mut calls: JoinSet<(String, Result<Option<Note>>)>,
        pending: &[(String, Note, u64)],
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        while let Some(joined) = calls.join_next().await {
            let Ok((id, result)) = joined else {
                continue;
            };
            match result {
                Ok(confirmed) => {
                    if let Some(confirmed) = confirmed {
                        self.apply_confirmed(&confirmed);
                    }
                    outcome.succeeded.push(id);
                }
                Err(error) => {
                    if let Some((_, snapshot, version)) =
                        pending.iter().find(|(pending_id, _, _)| *pending_id == id)
                    {
                        self.rollback_entry(&id, snapshot, *version);
                    }
                    outcome.failed.push((id, error));
                }
            }
        }
        for (id, _, version) in pending {
            self.finish_op(id, *version);
        }
        outcome
    }

    /// Restore one note to its snapshot, unless a later operation on the
    /// same id has already superseded this one.
    fn rollback_entry(&mut self, id: &str, snapshot: &Note, version: u64) {
        if !self.op_is_current(id, version) {
            tracing::debug!(%id, "skipping stale rollback");
            return;
        }
        match self.position(id) {
            Some(index) => self.notes[index] = snapshot.clone(),
            None => self.notes.insert(0, snapshot.clone()),
        }
        self.bump_revision();
    }

    fn report_bulk(&mut self, outcome: &BulkOutcome, operation: &str) {
        if outcome.is_complete() {
            self.last_error = None;
            return;
        }
        let error = Error::App(format!(
            "Failed to {operation} {} of {} notes",
            outcome.failed.len(),
            outcome.failed.len() + outcome.succeeded.len(),
        ));
        self.last_error = Some(error.to_string());
        self.notifier.error(&error);
    }

    fn apply_confirmed(&mut self, confirmed: &Note) {
        if let Some(index) = self.position(&confirmed.id) {
            self.notes[index] = confirmed.clone();
            self.bump_revision();
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Record one notification per failed operation and remember the message.
    fn fail(&mut self, error: Error) -> Error {
        tracing::warn!(%error, "note operation failed");
        self.last_error = Some(error.to_string());
        self.notifier.error(&error);
        error
    }

    fn begin_op(&mut self, id: &str) -> u64 {
        let version = self.versions.entry(id.to_string()).or_insert(0);
        *version += 1;
        *version
    }

    fn op_is_current(&self, id: &str, version: u64) -> bool {
        self.versions.get(id) == Some(&version)
    }

    fn finish_op(&mut self, id: &str, version: u64) {
        if self.op_is_current(id, version) {
            self.versions.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex, PoisonError};

    use pretty_assertions::assert_eq;

    use crate::models::Priority;
    use crate::notify::NotificationKind;

    use super::*;

    #[derive(Debug, Default)]
    struct MockNotesState {
        next_id: u64,
        fail_all: bool,
        fail_ids: HashSet<String>,
        list_result: Option<Result<Vec<Note>>>,
        calls: Vec<String>,
    }

    #[derive(Debug, Clone, Default)]
    struct MockNotesApi {
        inner: Arc<Mutex<MockNotesState>>,
    }

    impl MockNotesApi {
        fn lock(&self) -> std::sync::MutexGuard<'_, MockNotesState> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn fail_all(&self) {
            self.lock().fail_all = true;
        }

        fn fail_id(&self, id: &str) {
            self.lock().fail_ids.insert(id.to_string());
        }

        fn should_fail(&self, id: &str) -> bool {
            let state = self.lock();
            state.fail_all || state.fail_ids.contains(id)
        }

        fn server_note(&self, id: String, input: &NoteInput) -> Note {
            Note {
                id,
                title: input.title.clone(),
                content: input.content.clone(),
                category: input.category.clone(),
                priority: input.priority,
                mood: input.mood.clone(),
                tags: input.tags.clone(),
                color: input.color.clone(),
                pinned: false,
                archived: false,
                created_at: 7_000,
                updated_at: 7_000,
            }
        }
    }

    impl NotesApi for MockNotesApi {
        async fn list_notes(&self, _token: &str, _archived: bool) -> Result<Vec<Note>> {
            let mut state = self.lock();
            state.calls.push("list".to_string());
            state
                .list_result
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn create_note(&self, _token: &str, input: &NoteInput) -> Result<Note> {
            self.lock().calls.push("create".to_string());
            if self.should_fail("") {
                return Err(Error::Network("connection refused".to_string()));
            }
            let id = {
                let mut state = self.lock();
                state.next_id += 1;
                format!("srv-{}", state.next_id)
            };
            Ok(self.server_note(id, input))
        }

        async fn update_note(&self, _token: &str, id: &str, input: &NoteInput) -> Result<Note> {
            self.lock().calls.push(format!("update:{id}"));
            if self.should_fail(id) {
                return Err(Error::Network("connection refused".to_string()));
            }
            let mut note = self.server_note(id.to_string(), input);
            note.updated_at = 8_000;
            Ok(note)
        }

        async fn delete_note(&self, _token: &str, id: &str) -> Result<()> {
            self.lock().calls.push(format!("delete:{id}"));
            if self.should_fail(id) {
                return Err(Error::Network("connection refused".to_string()));
            }
            Ok(())
        }

        async fn set_archived(&self, _token: &str, id: &str, archived: bool) -> Result<Note> {
            self.lock().calls.push(format!("archive:{id}"));
            if self.should_fail(id) {
                return Err(Error::Server {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            let mut note = self.server_note(id.to_string(), &confirmed_input());
            note.archived = archived;
            Ok(note)
        }

        async fn set_pinned(&self, _token: &str, id: &str, pinned: bool) -> Result<Note> {
            self.lock().calls.push(format!("pin:{id}"));
            if self.should_fail(id) {
                return Err(Error::Server {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            let mut note = self.server_note(id.to_string(), &confirmed_input());
            note.pinned = pinned;
            Ok(note)
        }
    }

    fn confirmed_input() -> NoteInput {
        NoteInput {
            title: "from server".to_string(),
            content: "server body".to_string(),
            ..NoteInput::default()
        }
    }

    fn existing_note(id: &str, title: &str) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("{title} body"),
            category: "Work".to_string(),
            priority: Priority::Medium,
            mood: "focused".to_string(),
            tags: vec!["alpha".to_string()],
            color: "#ffcc00".to_string(),
            pinned: false,
            archived: false,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn store_with(notes: Vec<Note>) -> (NoteStore<MockNotesApi>, MockNotesApi, Notifier) {
        let api = MockNotesApi::default();
        let notifier = Notifier::new();
        let mut store = NoteStore::new(api.clone(), "tok", notifier.clone());
        store.notes = notes;
        (store, api, notifier)
    }

    fn input(title: &str, content: &str) -> NoteInput {
        NoteInput {
            title: title.to_string(),
            content: content.to_string(),
            ..NoteInput::default()
        }
    }

    #[tokio::test]
    async fn create_replaces_placeholder_with_server_note_in_slot() {
        let (mut store, _api, notifier) = store_with(vec![existing_note("5", "existing")]);

        let created = store.create(input("A", "B")).await.unwrap();
        assert_eq!(created.id, "srv-1");

        // The server note takes the placeholder's slot at the front.
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.notes()[0].id, "srv-1");
        assert_eq!(store.notes()[1].id, "5");
        assert!(store.notes().iter().all(|note| !note.has_temp_id()));

        let entries = notifier.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn failed_create_rolls_back_to_the_exact_prior_state() {
        let (mut store, api, notifier) = store_with(vec![
            existing_note("1", "first"),
            existing_note("2", "second"),
        ]);
        let before = store.notes().to_vec();
        api.fail_all();

        let error = store.create(input("A", "B")).await.unwrap_err();
        assert!(matches!(error, Error::Network(_)));
        assert_eq!(store.notes(), before.as_slice());
        assert_eq!(store.last_error(), Some(error.to_string()).as_deref());

        // Exactly one error notification for the failed operation.
        let entries = notifier.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn invalid_create_input_fails_before_any_network_call() {
        let (mut store, api, notifier) = store_with(Vec::new());

        let error = store.create(input("", "")).await.unwrap_err();
        assert!(matches!(error, Error::Validation { .. }));
        assert!(store.notes().is_empty());
        assert!(api.lock().calls.is_empty());
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn update_applies_optimistically_and_confirms_with_server_truth() {
        let (mut store, _api, _notifier) = store_with(vec![existing_note("5", "old")]);

        let updated = store.update("5", input("new title", "new body")).await.unwrap();
        assert_eq!(updated.title, "new title");
        assert_eq!(store.notes()[0].id, "5");
        assert_eq!(store.notes()[0].title, "new title");
        assert_eq!(store.notes()[0].updated_at, 8_000);
    }

    #[tokio::test]
    async fn failed_update_restores_the_snapshot_exactly() {
        let original = existing_note("5", "old");
        let (mut store, api, notifier) = store_with(vec![original.clone()]);
        api.fail_id("5");

        let error = store.update("5", input("new", "body")).await.unwrap_err();
        assert!(matches!(error, Error::Network(_)));
        assert_eq!(store.notes(), &[original]);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_note_reports_not_found() {
        let (mut store, _api, notifier) = store_with(Vec::new());
        let error = store.update("ghost", input("a", "b")).await.unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn delete_offers_undo_and_undo_recreates_under_new_identity() {
        let deleted_source = existing_note("5", "doomed");
        let (mut store, _api, notifier) = store_with(vec![deleted_source.clone()]);

        let deleted = store.delete("5").await.unwrap();
        assert!(store.notes().is_empty());
        assert_eq!(deleted, deleted_source);

        // The success notification carries the undo payload.
        let entries = notifier.snapshot();
        let action = entries[0].action.as_ref().unwrap();
        assert_eq!(action.label, "Undo");
        assert_eq!(
            action.command,
            ActionCommand::UndoDelete(NoteInput::from(&deleted_source))
        );

        let recreated = store.undo_delete(&deleted).await.unwrap();
        assert_ne!(recreated.id, "5");
        assert_eq!(recreated.title, deleted_source.title);
        assert_eq!(recreated.content, deleted_source.content);
        assert_eq!(recreated.category, deleted_source.category);
        assert_eq!(recreated.priority, deleted_source.priority);
        assert_eq!(recreated.mood, deleted_source.mood);
        assert_eq!(recreated.tags, deleted_source.tags);
        assert_eq!(recreated.color, deleted_source.color);
    }

    #[tokio::test]
    async fn failed_delete_reinserts_at_the_original_position() {
        let (mut store, api, notifier) = store_with(vec![
            existing_note("1", "first"),
            existing_note("2", "second"),
            existing_note("3", "third"),
        ]);
        let before = store.notes().to_vec();
        api.fail_id("2");

        let error = store.delete("2").await.unwrap_err();
        assert!(matches!(error, Error::Network(_)));
        assert_eq!(store.notes(), before.as_slice());
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn archive_applies_confirmed_server_entity_by_id_match() {
        let (mut store, _api, notifier) = store_with(vec![existing_note("5", "note")]);

        let confirmed = store.set_archived("5", true).await.unwrap();
        assert!(confirmed.archived);
        assert!(store.notes()[0].archived);
        // Server truth replaces the whole entity.
        assert_eq!(store.notes()[0].title, "from server");
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn failed_archive_changes_nothing_locally() {
        let original = existing_note("5", "note");
        let (mut store, api, notifier) = store_with(vec![original.clone()]);
        api.fail_id("5");

        let error = store.set_archived("5", true).await.unwrap_err();
        assert!(matches!(error, Error::Server { .. }));
        assert_eq!(store.notes(), &[original]);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn pin_applies_confirmed_server_entity() {
        let (mut store, _api, _notifier) = store_with(vec![existing_note("5", "note")]);
        let confirmed = store.set_pinned("5", true).await.unwrap();
        assert!(confirmed.pinned);
        assert!(store.notes()[0].pinned);
    }

    #[tokio::test]
    async fn bulk_archive_keeps_successes_when_one_id_fails() {
        let (mut store, api, notifier) = store_with(vec![
            existing_note("1", "first"),
            existing_note("2", "second"),
            existing_note("3", "third"),
        ]);
        api.fail_id("2");

        let ids: Vec<String> = ["1", "2", "3"].iter().map(|id| (*id).to_string()).collect();
        let outcome = store.bulk_archive(&ids, true).await;

        let mut succeeded = outcome.succeeded.clone();
        succeeded.sort();
        assert_eq!(succeeded, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "2");

        // Successes stay archived; the failure rolled back to its snapshot.
        let archived_flags: Vec<bool> = store.notes().iter().map(|note| note.archived).collect();
        assert_eq!(archived_flags, vec![true, false, true]);
        assert_eq!(store.notes()[1].title, "second");

        // One aggregate failure notification.
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.snapshot()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn bulk_delete_removes_successes_and_restores_failures() {
        let (mut store, api, _notifier) = store_with(vec![
            existing_note("1", "first"),
            existing_note("2", "second"),
            existing_note("3", "third"),
        ]);
        api.fail_id("3");

        let ids: Vec<String> = ["1", "3"].iter().map(|id| (*id).to_string()).collect();
        let outcome = store.bulk_delete(&ids).await;

        assert_eq!(outcome.succeeded, vec!["1".to_string()]);
        assert_eq!(outcome.failed.len(), 1);

        let remaining: Vec<&str> = store.notes().iter().map(|note| note.id.as_str()).collect();
        assert!(remaining.contains(&"2"));
        assert!(remaining.contains(&"3"));
        assert!(!remaining.contains(&"1"));
    }

    #[tokio::test]
    async fn bulk_with_all_successes_reports_no_failure() {
        let (mut store, _api, notifier) = store_with(vec![
            existing_note("1", "first"),
            existing_note("2", "second"),
        ]);
        let ids: Vec<String> = ["1", "2"].iter().map(|id| (*id).to_string()).collect();
        let outcome = store.bulk_archive(&ids, true).await;
        assert!(outcome.is_complete());
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn load_replaces_the_collection_and_clears_loading() {
        let (mut store, api, _notifier) = store_with(vec![existing_note("stale", "stale")]);
        api.lock().list_result = Some(Ok(vec![
            existing_note("1", "fresh"),
            existing_note("2", "fresher"),
        ]));

        store.load().await.unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn failed_load_keeps_collection_and_records_error() {
        let (mut store, api, notifier) = store_with(vec![existing_note("1", "kept")]);
        api.lock().list_result = Some(Err(Error::Network("offline".to_string())));

        let error = store.load().await.unwrap_err();
        assert!(matches!(error, Error::Network(_)));
        assert!(!store.is_loading());
        assert_eq!(store.notes().len(), 1);
        assert!(store.last_error().is_some());
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn view_settings_do_not_invalidate_the_collection_revision() {
        let (mut store, _api, _notifier) = store_with(vec![existing_note("1", "note")]);
        let revision = store.revision();

        store.set_search("query");
        store.set_sort(SortKey::Title);
        store.set_view_mode(ViewMode::List);
        store.set_show_archived(true);
        assert_eq!(store.revision(), revision);

        let mut cache = ViewCache::new();
        store.set_show_archived(false);
        store.set_search("");
        let first = store.sorted_view(&mut cache);
        let second = store.sorted_view(&mut cache);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
