use std::collections::{BTreeMap, VecDeque};

use parking_lot::{Condvar, Mutex};
use time::OffsetDateTime;

use super::{
    validate_content, NoteId, NoteStore, NoteSummary, SavedRecord, StoreError, StoreHealth,
    StoreResult,
};

/// A call observed by [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateOrUpdate {
        id: Option<NoteId>,
        title: String,
        body: String,
    },
    Fetch(NoteId),
    List,
    Delete(NoteId),
    Health,
}

/// In-process note store. Records every call, can fail the next saves on
/// demand and can hold saves at a gate so callers can act while a save is in
/// flight.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    gate: Mutex<bool>,
    gate_opened: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    notes: BTreeMap<NoteId, SavedRecord>,
    next_id: i64,
    calls: Vec<StoreCall>,
    pending_failures: VecDeque<StoreError>,
    unreachable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes<I>(notes: I) -> Self
    where
        I: IntoIterator<Item = SavedRecord>,
    {
        let store = Self::default();
        {
            let mut inner = store.inner.lock();
            for note in notes {
                inner.next_id = inner.next_id.max(note.id.0);
                inner.notes.insert(note.id, note);
            }
        }
        store
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    pub fn save_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, StoreCall::CreateOrUpdate { .. }))
            .collect()
    }

    pub fn note(&self, id: NoteId) -> Option<SavedRecord> {
        self.inner.lock().notes.get(&id).cloned()
    }

    /// The next `create_or_update` fails with `err` instead of touching state.
    pub fn fail_next_save(&self, err: StoreError) {
        self.inner.lock().pending_failures.push_back(err);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unreachable = unreachable;
    }

    /// Saves block until [`MemoryStore::resume`] is called.
    pub fn pause(&self) {
        *self.gate.lock() = true;
    }

    pub fn resume(&self) {
        let mut paused = self.gate.lock();
        *paused = false;
        self.gate_opened.notify_all();
    }

    fn wait_at_gate(&self) {
        let mut paused = self.gate.lock();
        while *paused {
            self.gate_opened.wait(&mut paused);
        }
    }
}

impl NoteStore for MemoryStore {
    fn create_or_update(
        &self,
        id: Option<NoteId>,
        title: &str,
        body: &str,
    ) -> StoreResult<SavedRecord> {
        self.inner.lock().calls.push(StoreCall::CreateOrUpdate {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
        });
        self.wait_at_gate();

        let mut inner = self.inner.lock();
        if inner.unreachable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        if let Some(err) = inner.pending_failures.pop_front() {
            return Err(err);
        }
        validate_content(title, body)?;
        let id = match id {
            Some(id) if inner.notes.contains_key(&id) => id,
            Some(id) => return Err(StoreError::NotFound(id)),
            None => {
                inner.next_id += 1;
                NoteId(inner.next_id)
            }
        };
        let record = SavedRecord {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
            last_modified: OffsetDateTime::now_utc(),
        };
        inner.notes.insert(id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: NoteId) -> StoreResult<SavedRecord> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Fetch(id));
        if inner.unreachable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        inner.notes.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<NoteSummary> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::List);
        if inner.unreachable {
            return Vec::new();
        }
        let mut notes: Vec<NoteSummary> = inner
            .notes
            .values()
            .map(|note| NoteSummary {
                id: note.id,
                title: note.title.clone(),
                size: note.body.len(),
                last_modified: note.last_modified,
            })
            .collect();
        notes.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.id.cmp(&a.id))
        });
        notes
    }

    fn delete(&self, id: NoteId) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Delete(id));
        if inner.unreachable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        inner
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn health(&self) -> StoreHealth {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::Health);
        if inner.unreachable {
            StoreHealth::Unreachable
        } else {
            StoreHealth::Connected
        }
    }
}
