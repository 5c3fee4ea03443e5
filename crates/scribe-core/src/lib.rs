//! scribe-core - Core library for Scribe
//!
//! This crate contains the client-side state machinery behind a note-taking
//! app backed by a REST API: the optimistic note store, the credential and
//! session persistence layer, the derived view selectors, and the
//! notification surface. No UI lives here; interfaces own the containers
//! and inject them.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod notify;
pub mod queries;
pub mod storage;
pub mod store;
pub mod util;

pub use error::{Error, Result, Severity};
pub use models::{Note, NoteInput, Priority, Session, User};
pub use store::NoteStore;
