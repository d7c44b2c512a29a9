use thiserror::Error;

use crate::storage::{NoteId, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("note title is empty")]
    EmptyTitle,

    #[error("note body is empty")]
    EmptyBody,
}

/// Why a save attempt did not produce a confirmed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a save is already in progress")]
    AlreadyInProgress,

    #[error("note {0} no longer exists")]
    NotFound(NoteId),

    #[error("{cause}")]
    Failed { cause: String },
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SaveError::NotFound(id),
            StoreError::Rejected(cause) | StoreError::Unavailable(cause) => {
                SaveError::Failed { cause }
            }
        }
    }
}

/// Title and body must both carry something other than whitespace.
pub fn validate_draft(title: &str, body: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    Ok(())
}
