use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};

use crate::draft::DraftSnapshot;
use crate::storage::{NoteStore, SavedRecord, StoreResult};

#[derive(Debug)]
pub(crate) struct SaveRequest {
    pub ticket: u64,
    pub snapshot: DraftSnapshot,
}

/// Store response to a dispatched save, tagged with the ticket it answers.
#[derive(Debug)]
pub struct SaveReply {
    pub(crate) ticket: u64,
    pub(crate) result: StoreResult<SavedRecord>,
}

/// Owns the thread that performs blocking `create_or_update` calls so the
/// editing loop never waits on the store.
pub(crate) struct SaveWorker {
    requests: Sender<SaveRequest>,
    replies: Receiver<SaveReply>,
}

impl SaveWorker {
    pub fn spawn(store: Arc<dyn NoteStore>) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<SaveRequest>();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<SaveReply>();
        thread::Builder::new()
            .name("notesync-save".into())
            .spawn(move || {
                for request in request_rx {
                    let SaveRequest { ticket, snapshot } = request;
                    tracing::debug!(ticket, id = ?snapshot.id, "store call started");
                    let result =
                        store.create_or_update(snapshot.id, snapshot.title(), snapshot.body());
                    if reply_tx.send(SaveReply { ticket, result }).is_err() {
                        break;
                    }
                }
                tracing::debug!("save worker exiting");
            })
            .context("spawning save worker thread")?;
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
        })
    }

    pub fn submit(&self, request: SaveRequest) -> std::result::Result<(), SaveRequest> {
        self.requests.send(request).map_err(|err| err.into_inner())
    }

    pub fn replies(&self) -> &Receiver<SaveReply> {
        &self.replies
    }
}
