use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use super::worker::{SaveReply, SaveRequest, SaveWorker};
use crate::draft::DraftSnapshot;
use crate::error::{validate_draft, SaveError};
use crate::storage::{NoteStore, SavedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SaveOrigin {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SaveAttempt {
    pub ticket: u64,
    pub origin: SaveOrigin,
    /// Caller-chosen token identifying which open note the attempt belongs to.
    pub epoch: u64,
    pub started_at: Instant,
    pub snapshot: DraftSnapshot,
    pub status: AttemptStatus,
}

#[derive(Debug)]
pub struct SaveResolution {
    pub attempt: SaveAttempt,
    pub result: std::result::Result<SavedRecord, SaveError>,
}

/// Sends drafts to the store one at a time.
///
/// A save requested while another is in flight is refused with
/// [`SaveError::AlreadyInProgress`]; nothing is queued.
pub struct SaveCoordinator {
    worker: SaveWorker,
    in_flight: Option<SaveAttempt>,
    next_ticket: u64,
}

impl SaveCoordinator {
    pub fn new(store: Arc<dyn NoteStore>) -> Result<Self> {
        Ok(Self {
            worker: SaveWorker::spawn(store)?,
            in_flight: None,
            next_ticket: 1,
        })
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&SaveAttempt> {
        self.in_flight.as_ref()
    }

    /// Dispatches `snapshot` to the store. Returns the ticket of the new attempt.
    pub fn save(
        &mut self,
        snapshot: DraftSnapshot,
        origin: SaveOrigin,
        epoch: u64,
        now: Instant,
    ) -> std::result::Result<u64, SaveError> {
        validate_draft(snapshot.title(), snapshot.body())?;
        if self.in_flight.is_some() {
            return Err(SaveError::AlreadyInProgress);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let attempt = SaveAttempt {
            ticket,
            origin,
            epoch,
            started_at: now,
            snapshot: snapshot.clone(),
            status: AttemptStatus::Pending,
        };
        if self.worker.submit(SaveRequest { ticket, snapshot }).is_err() {
            tracing::error!(ticket, "save worker is gone, save not dispatched");
            return Err(SaveError::Failed {
                cause: "save worker stopped".into(),
            });
        }
        tracing::debug!(ticket, %origin, id = ?attempt.snapshot.id, "save dispatched");
        self.in_flight = Some(attempt);
        Ok(ticket)
    }

    /// Channel the store replies arrive on; hand each reply to [`Self::complete`].
    pub fn replies(&self) -> Receiver<SaveReply> {
        self.worker.replies().clone()
    }

    pub fn complete(&mut self, reply: SaveReply) -> Option<SaveResolution> {
        match &self.in_flight {
            Some(attempt) if attempt.ticket == reply.ticket => {}
            _ => {
                tracing::warn!(ticket = reply.ticket, "ignoring reply for unknown save");
                return None;
            }
        }
        let mut attempt = self.in_flight.take()?;
        let result = reply.result.map_err(SaveError::from);
        attempt.status = match result {
            Ok(_) => AttemptStatus::Succeeded,
            Err(_) => AttemptStatus::Failed,
        };
        tracing::debug!(ticket = attempt.ticket, status = ?attempt.status, "save resolved");
        Some(SaveResolution { attempt, result })
    }

    /// Non-blocking: resolves the in-flight save if its reply has arrived.
    pub fn try_complete(&mut self) -> Option<SaveResolution> {
        self.in_flight.as_ref()?;
        match self.worker.replies().try_recv() {
            Ok(reply) => self.complete(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.abandon(),
        }
    }

    /// Blocks up to `timeout` for the in-flight save to resolve.
    pub fn wait_complete(&mut self, timeout: Duration) -> Option<SaveResolution> {
        self.in_flight.as_ref()?;
        match self.worker.replies().recv_timeout(timeout) {
            Ok(reply) => self.complete(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.abandon(),
        }
    }

    fn abandon(&mut self) -> Option<SaveResolution> {
        let mut attempt = self.in_flight.take()?;
        tracing::error!(ticket = attempt.ticket, "save worker stopped before replying");
        attempt.status = AttemptStatus::Failed;
        Some(SaveResolution {
            attempt,
            result: Err(SaveError::Failed {
                cause: "save worker stopped".into(),
            }),
        })
    }
}
