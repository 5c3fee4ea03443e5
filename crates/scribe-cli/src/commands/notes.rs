//! Note CRUD command handlers.

use std::env;
use std::process::Command;

use chrono::Utc;

use scribe_core::queries::{FilterState, ViewCache};
use scribe_core::{NoteInput, Priority};

use crate::cli::{PriorityArg, SortArg};
use crate::error::CliError;

use super::common::{
    format_note_lines, print_notifications, remember_deleted, resolve_note_id, short_id,
    take_deleted, AppContext,
};

pub struct ListArgs {
    pub archived: bool,
    pub search: Option<String>,
    pub category: Option<String>,
    pub priority: Option<PriorityArg>,
    pub tag: Option<String>,
    pub sort: Option<SortArg>,
    pub json: bool,
}

pub async fn run_list(context: &AppContext, args: ListArgs) -> Result<(), CliError> {
    let stored = context.prefs.preferences()?;
    let mut store = context.note_store()?;

    let flags_given = args.search.is_some()
        || args.category.is_some()
        || args.priority.is_some()
        || args.tag.is_some();
    let filters = if flags_given {
        FilterState {
            search: args.search.clone().unwrap_or_default(),
            category: args.category,
            priority: args.priority.map(Priority::from),
            tag: args.tag,
        }
    } else {
        stored.filters
    };
    store.set_filters(filters);
    store.set_sort(args.sort.map_or(stored.sort_by, Into::into));
    store.set_show_archived(args.archived || stored.show_archived);

    store.load().await?;
    if let Some(query) = &args.search {
        context.prefs.record_search(query)?;
    }

    let mut cache = ViewCache::new();
    let view = store.sorted_view(&mut cache);
    if args.json {
        println!("{}", serde_json::to_string_pretty(view.as_slice())?);
    } else if view.is_empty() {
        println!("No notes found.");
    } else {
        for line in format_note_lines(&view) {
            println!("{line}");
        }
    }
    Ok(())
}

pub struct AddArgs {
    pub title: String,
    pub content: Option<String>,
    pub category: Option<String>,
    pub priority: Option<PriorityArg>,
    pub mood: Option<String>,
    pub tags: Vec<String>,
    pub color: Option<String>,
}

pub async fn run_add(context: &AppContext, args: AddArgs) -> Result<(), CliError> {
    let content = match args.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => {
            // Resume from an autosaved draft when one is still fresh.
            let initial = context
                .prefs
                .load_draft()?
                .map(|draft| draft.content)
                .unwrap_or_default();
            capture_editor_input(&initial)?.ok_or(CliError::EmptyContent)?
        }
    };

    let input = NoteInput {
        title: args.title,
        content,
        category: args.category.unwrap_or_default(),
        priority: args.priority.map(Priority::from).unwrap_or_default(),
        mood: args.mood.unwrap_or_default(),
        tags: args.tags,
        color: args.color.unwrap_or_default(),
    };
    context.prefs.save_draft(&input)?;

    let mut store = context.note_store()?;
    let result = store.create(input).await;
    print_notifications(&context.notifier);
    let note = result?;
    context.prefs.clear_draft()?;
    println!("{}", note.id);
    Ok(())
}

pub struct EditArgs {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub priority: Option<PriorityArg>,
    pub mood: Option<String>,
    pub tags: Vec<String>,
    pub color: Option<String>,
    pub editor: bool,
}

pub async fn run_edit(context: &AppContext, args: EditArgs) -> Result<(), CliError> {
    let mut store = context.note_store()?;
    store.load().await?;
    let note = resolve_note_id(store.notes(), &args.id)?.clone();

    let content = if args.editor {
        capture_editor_input(&note.content)?.ok_or(CliError::EmptyContent)?
    } else {
        args.content.unwrap_or_else(|| note.content.clone())
    };

    let input = NoteInput {
        title: args.title.unwrap_or_else(|| note.title.clone()),
        content,
        category: args.category.unwrap_or_else(|| note.category.clone()),
        priority: args.priority.map_or(note.priority, Priority::from),
        mood: args.mood.unwrap_or_else(|| note.mood.clone()),
        tags: if args.tags.is_empty() {
            note.tags.clone()
        } else {
            args.tags
        },
        color: args.color.unwrap_or_else(|| note.color.clone()),
    };

    let result = store.update(&note.id, input).await;
    print_notifications(&context.notifier);
    let updated = result?;
    println!("{}", updated.id);
    Ok(())
}

pub async fn run_delete(context: &AppContext, id: &str) -> Result<(), CliError> {
    let mut store = context.note_store()?;
    store.load().await?;
    let note_id = resolve_note_id(store.notes(), id)?.id.clone();

    let result = store.delete(&note_id).await;
    print_notifications(&context.notifier);
    let deleted = result?;
    remember_deleted(&context.backend, &deleted)?;
    println!("Deleted {}.", short_id(&note_id));
    Ok(())
}

pub async fn run_undo(context: &AppContext) -> Result<(), CliError> {
    let input = take_deleted(&context.backend)?;
    let mut store = context.note_store()?;

    let result = store.create(input.clone()).await;
    print_notifications(&context.notifier);
    match result {
        Ok(note) => {
            println!("Recreated as {}", note.id);
            Ok(())
        }
        Err(error) => {
            // Keep the payload so the user can retry.
            scribe_core::storage::KeyValueStore::write_json(
                &context.backend,
                super::common::UNDO_KEY,
                &input,
            )?;
            Err(error.into())
        }
    }
}

pub async fn run_archive(context: &AppContext, id: &str, restore: bool) -> Result<(), CliError> {
    let mut store = context.note_store()?;
    // Restoring operates on the archived partition.
    store.set_show_archived(restore);
    store.load().await?;
    let note_id = resolve_note_id(store.notes(), id)?.id.clone();

    let result = store.set_archived(&note_id, !restore).await;
    print_notifications(&context.notifier);
    result?;
    println!(
        "{} {}.",
        if restore { "Restored" } else { "Archived" },
        short_id(&note_id)
    );
    Ok(())
}

pub async fn run_pin(context: &AppContext, id: &str, unpin: bool) -> Result<(), CliError> {
    let mut store = context.note_store()?;
    store.load().await?;
    let note_id = resolve_note_id(store.notes(), id)?.id.clone();

    let result = store.set_pinned(&note_id, !unpin).await;
    print_notifications(&context.notifier);
    result?;
    println!(
        "{} {}.",
        if unpin { "Unpinned" } else { "Pinned" },
        short_id(&note_id)
    );
    Ok(())
}

fn capture_editor_input(initial: &str) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let path = env::temp_dir().join(format!(
        "scribe-note-{}-{}.md",
        std::process::id(),
        Utc::now().timestamp_millis()
    ));
    std::fs::write(&path, initial)?;

    let status = Command::new(&editor).arg(&path).status();
    let content = std::fs::read_to_string(&path)?;
    let _ = std::fs::remove_file(&path);

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => {
            return Err(CliError::EditorFailed(format!(
                "`{editor}` exited with status {status}"
            )))
        }
        Err(error) => return Err(error.into()),
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_editor_is_defined() {
        assert!(!default_editor().is_empty());
    }
}
