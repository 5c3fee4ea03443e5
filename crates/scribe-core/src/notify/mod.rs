//! Notification / error surface.
//!
//! A bounded, ordered queue of transient user-facing messages fed by the
//! outcomes of session and note operations. Enqueue is append-only (oldest
//! entries are evicted past capacity); dismissal removes by id. Severity of
//! the originating error decides the default dismiss behavior: low-severity
//! entries auto-dismiss, high and critical ones stay until acknowledged.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Severity};
use crate::models::NoteInput;
use crate::util::unix_timestamp_ms;

/// Most entries kept at once; the oldest is evicted beyond this.
pub const QUEUE_CAPACITY: usize = 32;

const DISMISS_SHORT_MS: u64 = 4_000;
const DISMISS_LONG_MS: u64 = 6_000;
/// Sticky: stays until explicitly dismissed.
pub const STICKY: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
    Loading,
}

/// Typed command behind a notification action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCommand {
    /// Recreate the deleted note from its captured field values.
    UndoDelete(NoteInput),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub command: ActionCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub action: Option<NotificationAction>,
    /// Auto-dismiss delay in milliseconds; [`STICKY`] means no auto-dismiss.
    pub duration_ms: u64,
    pub created_at: i64,
}

#[derive(Debug, Default)]
struct NotificationQueue {
    entries: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    fn push(
        &mut self,
        kind: NotificationKind,
        message: String,
        action: Option<NotificationAction>,
        duration_ms: u64,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push_back(Notification {
            id,
            kind,
            message,
            action,
            duration_ms,
            created_at: unix_timestamp_ms(),
        });
        while self.entries.len() > QUEUE_CAPACITY {
            self.entries.pop_front();
        }
        id
    }

    fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }
}

/// Shared handle to the notification queue.
///
/// Clonable so the note store and the application root observe the same
/// queue; all methods are non-blocking from the caller's perspective.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<NotificationQueue>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<T>(&self, apply: impl FnOnce(&mut NotificationQueue) -> T) -> T {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut queue)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.with_queue(|queue| {
            queue.push(NotificationKind::Success, message.into(), None, DISMISS_SHORT_MS)
        })
    }

    pub fn success_with_action(
        &self,
        message: impl Into<String>,
        action: NotificationAction,
    ) -> u64 {
        self.with_queue(|queue| {
            queue.push(
                NotificationKind::Success,
                message.into(),
                Some(action),
                DISMISS_LONG_MS,
            )
        })
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.with_queue(|queue| {
            queue.push(NotificationKind::Info, message.into(), None, DISMISS_SHORT_MS)
        })
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.with_queue(|queue| {
            queue.push(NotificationKind::Warning, message.into(), None, DISMISS_LONG_MS)
        })
    }

    /// Enqueue a failure, with dismiss behavior derived from its severity.
    pub fn error(&self, error: &Error) -> u64 {
        let duration_ms = match error.severity() {
            Severity::Low => DISMISS_SHORT_MS,
            Severity::Medium => DISMISS_LONG_MS,
            Severity::High | Severity::Critical => STICKY,
        };
        self.with_queue(|queue| {
            queue.push(NotificationKind::Error, error.to_string(), None, duration_ms)
        })
    }

    pub fn dismiss(&self, id: u64) -> bool {
        self.with_queue(|queue| queue.dismiss(id))
    }

    /// Current queue contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.with_queue(|queue| queue.entries.iter().cloned().collect())
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.with_queue(|queue| queue.entries.drain(..).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.with_queue(|queue| queue.entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_preserves_order_and_assigns_unique_ids() {
        let notifier = Notifier::new();
        let first = notifier.success("one");
        let second = notifier.info("two");
        assert_ne!(first, second);

        let entries = notifier.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "one");
        assert_eq!(entries[1].message, "two");
    }

    #[test]
    fn capacity_evicts_oldest_entries() {
        let notifier = Notifier::new();
        for index in 0..(QUEUE_CAPACITY + 3) {
            notifier.info(format!("message {index}"));
        }
        let entries = notifier.snapshot();
        assert_eq!(entries.len(), QUEUE_CAPACITY);
        assert_eq!(entries[0].message, "message 3");
    }

    #[test]
    fn dismiss_removes_by_id() {
        let notifier = Notifier::new();
        let id = notifier.success("bye");
        assert!(notifier.dismiss(id));
        assert!(!notifier.dismiss(id));
        assert!(notifier.is_empty());
    }

    #[test]
    fn error_severity_drives_dismiss_duration() {
        let notifier = Notifier::new();
        notifier.error(&Error::invalid_field("title", "required"));
        notifier.error(&Error::Server {
            status: 500,
            message: "boom".to_string(),
        });

        let entries = notifier.snapshot();
        assert!(entries[0].duration_ms > 0);
        assert_eq!(entries[1].duration_ms, STICKY);
    }

    #[test]
    fn undo_action_carries_the_note_payload() {
        let notifier = Notifier::new();
        let input = NoteInput {
            title: "Deleted".to_string(),
            content: "Body".to_string(),
            ..NoteInput::default()
        };
        notifier.success_with_action(
            "Note deleted",
            NotificationAction {
                label: "Undo".to_string(),
                command: ActionCommand::UndoDelete(input.clone()),
            },
        );

        let entries = notifier.snapshot();
        let action = entries[0].action.as_ref().unwrap();
        assert_eq!(action.label, "Undo");
        assert_eq!(action.command, ActionCommand::UndoDelete(input));
    }
}
