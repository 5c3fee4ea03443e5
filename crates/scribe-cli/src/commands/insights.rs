//! Stats, tags, searches, and preferences handlers.

use chrono::Utc;

use scribe_core::api::NotesApi;
use scribe_core::queries::{all_tags, notes_stats};
use scribe_core::Note;

use crate::cli::{SortArg, ViewArg};
use crate::error::CliError;

use super::common::AppContext;

/// Both partitions: stats and the tag index cover archived notes too.
async fn fetch_all_notes(context: &AppContext) -> Result<Vec<Note>, CliError> {
    let token = context
        .manager
        .credentials()
        .get_token()?
        .ok_or(CliError::NotSignedIn)?;
    let mut notes = context.api.list_notes(&token, false).await?;
    notes.extend(context.api.list_notes(&token, true).await?);
    Ok(notes)
}

pub async fn run_stats(context: &AppContext, json: bool) -> Result<(), CliError> {
    let notes = fetch_all_notes(context).await?;
    let stats = notes_stats(&notes, Utc::now().timestamp_millis());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total:    {}", stats.total);
    println!("Active:   {}", stats.active);
    println!("Archived: {}", stats.archived);
    println!("Pinned:   {}", stats.pinned);
    println!(
        "Priority: {} high / {} medium / {} low",
        stats.high_priority, stats.medium_priority, stats.low_priority
    );
    println!(
        "Last 7 days: {} created, {} updated",
        stats.created_last_week, stats.updated_last_week
    );
    if !stats.by_category.is_empty() {
        println!("Categories:");
        for (category, count) in &stats.by_category {
            println!("  {category:<16} {count}");
        }
    }
    Ok(())
}

pub async fn run_tags(context: &AppContext) -> Result<(), CliError> {
    let notes = fetch_all_notes(context).await?;
    let tags = all_tags(&notes);
    if tags.is_empty() {
        println!("No tags in use.");
    } else {
        for tag in tags {
            println!("#{tag}");
        }
    }
    Ok(())
}

pub fn run_searches(context: &AppContext) -> Result<(), CliError> {
    let searches = context.prefs.recent_searches()?;
    if searches.is_empty() {
        println!("No recent searches.");
    } else {
        for (index, query) in searches.iter().enumerate() {
            println!("{:>2}. {query}", index + 1);
        }
    }
    Ok(())
}

pub fn run_config(
    context: &AppContext,
    sort: Option<SortArg>,
    view: Option<ViewArg>,
    show_archived: Option<bool>,
) -> Result<(), CliError> {
    let mut preferences = context.prefs.preferences()?;
    let changed = sort.is_some() || view.is_some() || show_archived.is_some();

    if let Some(sort) = sort {
        preferences.sort_by = sort.into();
    }
    if let Some(view) = view {
        preferences.view_mode = view.into();
    }
    if let Some(show_archived) = show_archived {
        preferences.show_archived = show_archived;
    }
    if changed {
        context.prefs.set_preferences(&preferences)?;
    }

    println!("sort:          {:?}", preferences.sort_by);
    println!("view:          {:?}", preferences.view_mode);
    println!("show archived: {}", preferences.show_archived);
    if !preferences.filters.is_empty() {
        println!("saved filters: {:?}", preferences.filters);
    }
    Ok(())
}
