//! Save dispatch and the debounced autosave timer.

pub mod coordinator;
pub mod scheduler;
mod worker;

pub use coordinator::{
    AttemptStatus, SaveAttempt, SaveCoordinator, SaveOrigin, SaveResolution,
};
pub use scheduler::{AutoSaveScheduler, ScheduleState};
pub use worker::SaveReply;
