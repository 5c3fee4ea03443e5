//! Shared context and output helpers for command handlers.

use std::env;

use chrono::Utc;

use scribe_core::api::HttpApi;
use scribe_core::auth::AuthManager;
use scribe_core::notify::{ActionCommand, Notification, NotificationKind, Notifier};
use scribe_core::storage::prefs::AppPrefs;
use scribe_core::storage::KeyValueStore;
use scribe_core::{Note, NoteStore};

use crate::error::CliError;
use crate::stores::{open_store, CliStore};

const DEFAULT_API_URL: &str = "http://localhost:4000/api";

/// Plain-store key holding the last deleted note's field values, so undo
/// survives across CLI invocations.
pub const UNDO_KEY: &str = "cli.undo";

/// Everything a command handler needs, built once per invocation.
pub struct AppContext {
    pub api: HttpApi,
    pub backend: CliStore,
    pub manager: AuthManager<HttpApi, CliStore>,
    pub prefs: AppPrefs<CliStore>,
    pub notifier: Notifier,
}

impl AppContext {
    pub fn build() -> Result<Self, CliError> {
        let base_url = env::var("SCRIBE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api = HttpApi::new(&base_url)?;
        let backend = open_store();
        let manager = AuthManager::new(api.clone(), backend.clone());
        manager.initialize()?;
        Ok(Self {
            api,
            backend: backend.clone(),
            manager,
            prefs: AppPrefs::new(backend),
            notifier: Notifier::new(),
        })
    }

    /// A note store bound to the stored token, or a sign-in hint.
    pub fn note_store(&self) -> Result<NoteStore<HttpApi>, CliError> {
        let token = self
            .manager
            .credentials()
            .get_token()?
            .ok_or(CliError::NotSignedIn)?;
        Ok(NoteStore::new(self.api.clone(), token, self.notifier.clone()))
    }
}

/// Print everything queued on the notification surface, then clear it.
pub fn print_notifications(notifier: &Notifier) {
    for entry in notifier.drain() {
        println!("{}", format_notification(&entry));
    }
}

fn format_notification(entry: &Notification) -> String {
    let prefix = match entry.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
        NotificationKind::Warning => "warn",
        NotificationKind::Info => "info",
        NotificationKind::Loading => "...",
    };
    match &entry.action {
        Some(action) => {
            let hint = match &action.command {
                ActionCommand::UndoDelete(_) => "scribe undo",
            };
            format!("[{prefix}] {} ({}: `{hint}`)", entry.message, action.label)
        }
        None => format!("[{prefix}] {}", entry.message),
    }
}

/// Resolve a note by exact id or unique id prefix against the loaded
/// collection.
pub fn resolve_note_id<'a>(notes: &'a [Note], query: &str) -> Result<&'a Note, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::NoteNotFound(query.to_string()));
    }
    if let Some(note) = notes.iter().find(|note| note.id == query) {
        return Ok(note);
    }

    let matches: Vec<&Note> = notes
        .iter()
        .filter(|note| note.id.starts_with(query))
        .collect();
    match matches.len() {
        0 => Err(CliError::NoteNotFound(query.to_string())),
        1 => Ok(matches[0]),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|note| note.id.clone())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "id prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Render one aligned listing row per note.
pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let marker = if note.pinned { "*" } else { " " };
            let title: String = note.title.chars().take(32).collect();
            let relative_time = format_relative_time(note.updated_at, now_ms);
            let tags = if note.tags.is_empty() {
                String::new()
            } else {
                format!("  #{}", note.tags.join(" #"))
            };
            format!(
                "{marker} {:<14}  {title:<32}  {:<10}  {:<6}  {relative_time}{tags}",
                short_id(&note.id),
                note.category,
                note.priority.as_str(),
            )
        })
        .collect()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(14).collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

/// Stash the undo payload for the next invocation.
pub fn remember_deleted(backend: &CliStore, deleted: &Note) -> Result<(), CliError> {
    let input = scribe_core::NoteInput::from(deleted);
    backend.write_json(UNDO_KEY, &input)?;
    Ok(())
}

pub fn take_deleted(backend: &CliStore) -> Result<scribe_core::NoteInput, CliError> {
    let input = backend
        .read_json::<scribe_core::NoteInput>(UNDO_KEY)?
        .ok_or(CliError::NothingToUndo)?;
    backend.remove(UNDO_KEY)?;
    Ok(input)
}
