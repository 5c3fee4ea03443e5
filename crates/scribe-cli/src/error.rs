//! CLI error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] scribe_core::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] scribe_core::storage::StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `scribe auth login` first.")]
    NotSignedIn,
    #[error("Note content cannot be empty")]
    EmptyContent,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
}
