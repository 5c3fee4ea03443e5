//! Note model and mutation payloads

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

/// Maximum accepted title length, in characters.
pub const TITLE_MAX_CHARS: usize = 100;
/// Maximum accepted content length, in characters.
pub const CONTENT_MAX_CHARS: usize = 5000;
/// Maximum number of tags kept on a note.
pub const TAGS_MAX: usize = 10;
/// Category applied when none is provided.
pub const DEFAULT_CATEGORY: &str = "Others";

const TEMP_ID_PREFIX: &str = "temp-";

/// Note priority, ordered high > medium > low for sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Low,
    #[default]
    #[serde(other)]
    Medium,
}

impl Priority {
    /// Sort weight: high 3, medium 2, low 1.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A note as held in the collection and exchanged with the backend.
///
/// Ids are opaque server-assigned strings; notes inserted optimistically
/// carry a `temp-<millis>` placeholder until the server id arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    /// Build the optimistic local placeholder for a pending create.
    #[must_use]
    pub fn local(input: &NoteInput) -> Self {
        let now = unix_timestamp_ms();
        Self {
            id: temp_id(),
            title: input.title.clone(),
            content: input.content.clone(),
            category: input.category.clone(),
            priority: input.priority,
            mood: input.mood.clone(),
            tags: input.tags.clone(),
            color: input.color.clone(),
            pinned: false,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this entry still carries an optimistic placeholder id.
    #[must_use]
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Overwrite the mutable fields from a payload, refreshing `updated_at`.
    pub fn apply_input(&mut self, input: &NoteInput) {
        self.title = input.title.clone();
        self.content = input.content.clone();
        self.category = input.category.clone();
        self.priority = input.priority;
        self.mood = input.mood.clone();
        self.tags = input.tags.clone();
        self.color = input.color.clone();
        self.updated_at = unix_timestamp_ms();
    }
}

/// Create/update payload, normalized before it is applied or sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: String,
}

impl NoteInput {
    /// Trim text fields, default the category, and clean the tag list.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self.mood = self.mood.trim().to_string();
        self.color = self.color.trim().to_string();
        let category = self.category.trim();
        self.category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category.to_string()
        };
        self.tags = normalize_tags(&self.tags);
        self
    }

    /// Client-side field validation, reported as a field-error map.
    pub fn validate(&self) -> Result<()> {
        let mut fields = std::collections::BTreeMap::new();
        if self.title.is_empty() {
            fields.insert("title".to_string(), "Title is required".to_string());
        } else if self.title.chars().count() > TITLE_MAX_CHARS {
            fields.insert(
                "title".to_string(),
                format!("Title must be at most {TITLE_MAX_CHARS} characters"),
            );
        }
        if self.content.is_empty() {
            fields.insert("content".to_string(), "Content is required".to_string());
        } else if self.content.chars().count() > CONTENT_MAX_CHARS {
            fields.insert(
                "content".to_string(),
                format!("Content must be at most {CONTENT_MAX_CHARS} characters"),
            );
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::validation("Note fields are invalid", fields))
        }
    }
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
            priority: note.priority,
            mood: note.mood.clone(),
            tags: note.tags.clone(),
            color: note.color.clone(),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Trim, drop empties, deduplicate preserving order, cap the list length.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .take(TAGS_MAX)
        .collect()
}

/// Generate a strictly increasing `temp-<millis>` placeholder id.
fn temp_id() -> String {
    static LAST_TEMP_MS: AtomicI64 = AtomicI64::new(0);

    let now = unix_timestamp_ms();
    let unique = LAST_TEMP_MS
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
            Some(last.max(now - 1) + 1)
        })
        .map_or(now, |previous| previous.max(now - 1) + 1);
    format!("{TEMP_ID_PREFIX}{unique}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn input(title: &str, content: &str) -> NoteInput {
        NoteInput {
            title: title.to_string(),
            content: content.to_string(),
            ..NoteInput::default()
        }
    }

    #[test]
    fn normalized_defaults_category_and_cleans_tags() {
        let raw = NoteInput {
            category: "   ".to_string(),
            tags: vec![
                " work ".to_string(),
                String::new(),
                "work".to_string(),
                "urgent".to_string(),
            ],
            ..input(" Title ", "Body")
        };

        let normalized = raw.normalized();
        assert_eq!(normalized.title, "Title");
        assert_eq!(normalized.category, DEFAULT_CATEGORY);
        assert_eq!(normalized.tags, vec!["work".to_string(), "urgent".to_string()]);
    }

    #[test]
    fn normalize_tags_caps_list_length() {
        let many: Vec<String> = (0..20).map(|index| format!("tag{index}")).collect();
        assert_eq!(normalize_tags(&many).len(), TAGS_MAX);
    }

    #[test]
    fn validate_reports_field_errors() {
        let error = input("", "").validate().unwrap_err();
        let Error::Validation { fields, .. } = error else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("content"));
    }

    #[test]
    fn validate_rejects_oversized_title() {
        let long_title = "x".repeat(TITLE_MAX_CHARS + 1);
        assert!(input(&long_title, "Body").validate().is_err());
        let max_title = "x".repeat(TITLE_MAX_CHARS);
        assert!(input(&max_title, "Body").validate().is_ok());
    }

    #[test]
    fn local_note_carries_temp_id_and_matching_timestamps() {
        let note = Note::local(&input("A", "B").normalized());
        assert!(note.has_temp_id());
        assert_eq!(note.created_at, note.updated_at);
        assert!(!note.pinned);
        assert!(!note.archived);
    }

    #[test]
    fn temp_ids_are_unique_under_rapid_creation() {
        let first = Note::local(&input("A", "B"));
        let second = Note::local(&input("A", "B"));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn priority_weights_order_high_over_low() {
        assert!(Priority::High.weight() > Priority::Medium.weight());
        assert!(Priority::Medium.weight() > Priority::Low.weight());
    }

    #[test]
    fn note_serializes_with_camel_case_wire_names() {
        let note = Note::local(&input("A", "B"));
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value.get("priority").unwrap(), "medium");
    }

    #[test]
    fn unknown_priority_deserializes_as_medium() {
        let priority: Priority = serde_json::from_str("\"someday\"").unwrap();
        assert_eq!(priority, Priority::Medium);
    }
}
