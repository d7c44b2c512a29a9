pub mod app;
pub mod autosave;
pub mod cli;
pub mod clock;
pub mod config;
pub mod draft;
pub mod error;
pub mod storage;

pub use app::{Session, SessionStatus};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{SaveError, ValidationError};
pub use storage::{NoteId, NoteStore, SavedRecord};
