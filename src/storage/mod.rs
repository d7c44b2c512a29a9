use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub mod memory;
mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Identifier allocated by the store on the first successful save of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NoteId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A note as confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    /// Body length in bytes.
    pub size: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StoreHealth {
    Connected,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("note {0} not found")]
    NotFound(NoteId),

    #[error("rejected by store: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The persistence service the autosave engine talks to.
///
/// Calls are blocking; the engine only invokes `create_or_update` from its
/// save worker thread, so implementations must be shareable across threads.
pub trait NoteStore: Send + Sync {
    /// Creates a note when `id` is `None`, otherwise replaces the content of `id`.
    fn create_or_update(
        &self,
        id: Option<NoteId>,
        title: &str,
        body: &str,
    ) -> StoreResult<SavedRecord>;

    fn fetch(&self, id: NoteId) -> StoreResult<SavedRecord>;

    /// Most recently modified first. Never fails fatally: an unreadable store
    /// yields an empty listing.
    fn list(&self) -> Vec<NoteSummary>;

    fn delete(&self, id: NoteId) -> StoreResult<()>;

    fn health(&self) -> StoreHealth;
}

fn validate_content(title: &str, body: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::Rejected("note title is required".into()));
    }
    if body.trim().is_empty() {
        return Err(StoreError::Rejected("note content is required".into()));
    }
    Ok(())
}
