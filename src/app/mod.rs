use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use time::OffsetDateTime;

use crate::autosave::{
    AutoSaveScheduler, SaveCoordinator, SaveOrigin, SaveReply, SaveResolution, ScheduleState,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{SettingsSource, SwitchPolicy};
use crate::draft::DraftState;
use crate::error::{validate_draft, SaveError};
use crate::storage::{NoteId, NoteStore, SavedRecord, StoreError};

pub mod actions;
pub mod event_loop;
pub mod notify;

pub use actions::EditorEvent;
pub use notify::{ChannelNotifier, ConsoleNotifier, Notice, NoticeKind, Notifier};

const EMPTY_FIELDS_MESSAGE: &str = "Please provide both title and content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Saving,
    Unsaved,
    SavedAt(OffsetDateTime),
    Never,
}

impl SessionStatus {
    pub fn label(&self, now: OffsetDateTime) -> String {
        match self {
            SessionStatus::Saving => "Saving...".to_string(),
            SessionStatus::Unsaved => "Unsaved changes".to_string(),
            SessionStatus::Never => "Not saved yet".to_string(),
            SessionStatus::SavedAt(at) => {
                let elapsed = (now - *at).whole_seconds().max(0);
                if elapsed >= 60 {
                    format!("Saved {}m ago", elapsed / 60)
                } else {
                    format!("Saved {elapsed}s ago")
                }
            }
        }
    }
}

/// One editing session: the open draft, its autosave timer and the single
/// save slot, driven one event at a time by the host loop.
pub struct Session {
    store: Arc<dyn NoteStore>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsSource>,
    clock: Arc<dyn Clock>,
    switch_policy: SwitchPolicy,
    show_save_status: bool,
    draft: DraftState,
    coordinator: SaveCoordinator,
    scheduler: AutoSaveScheduler,
    saved_at: Option<OffsetDateTime>,
    /// Bumped whenever a different note is opened; saves remember the value
    /// they were dispatched under.
    epoch: u64,
}

impl Session {
    pub fn new(
        store: Arc<dyn NoteStore>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsSource>,
    ) -> Result<Self> {
        let coordinator = SaveCoordinator::new(Arc::clone(&store))?;
        Ok(Self {
            store,
            notifier,
            settings,
            clock: Arc::new(SystemClock),
            switch_policy: SwitchPolicy::default(),
            show_save_status: true,
            draft: DraftState::new(),
            coordinator,
            scheduler: AutoSaveScheduler::new(),
            saved_at: None,
            epoch: 0,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_switch_policy(mut self, policy: SwitchPolicy) -> Self {
        self.switch_policy = policy;
        self
    }

    pub fn with_save_status(mut self, show: bool) -> Self {
        self.show_save_status = show;
        self
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.is_dirty()
    }

    pub fn saved_at(&self) -> Option<OffsetDateTime> {
        self.saved_at
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.coordinator.is_save_in_flight()
    }

    pub fn schedule(&self) -> ScheduleState {
        self.scheduler.state()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.due_at()
    }

    pub fn save_replies(&self) -> Receiver<SaveReply> {
        self.coordinator.replies()
    }

    pub fn status(&self) -> SessionStatus {
        let saving_current = self
            .coordinator
            .in_flight()
            .is_some_and(|attempt| attempt.epoch == self.epoch);
        if saving_current {
            SessionStatus::Saving
        } else if self.draft.is_dirty() {
            SessionStatus::Unsaved
        } else if let Some(at) = self.saved_at {
            SessionStatus::SavedAt(at)
        } else {
            SessionStatus::Never
        }
    }

    /// `None` when the editor is configured to hide the save status.
    pub fn status_line(&self) -> Option<String> {
        self.show_save_status.then(|| self.status().label(self.clock.now_utc()))
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.set_title(title);
        self.after_mutation();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.draft.set_body(body);
        self.after_mutation();
    }

    fn after_mutation(&mut self) {
        let settings = self.settings.auto_save();
        self.scheduler
            .on_mutation(self.clock.now(), self.draft.is_dirty(), settings);
    }

    /// Saves right away, skipping the autosave delay. Runs even when the draft
    /// is clean.
    pub fn manual_save(&mut self) -> Result<(), SaveError> {
        if let Err(err) = validate_draft(self.draft.title(), self.draft.body()) {
            tracing::debug!(%err, "manual save refused");
            self.notifier.notify(EMPTY_FIELDS_MESSAGE, NoticeKind::Error);
            return Err(err.into());
        }
        let snapshot = self.draft.snapshot();
        match self
            .coordinator
            .save(snapshot, SaveOrigin::Manual, self.epoch, self.clock.now())
        {
            Ok(ticket) => {
                tracing::info!(ticket, note_id = ?self.draft.id(), "manual save dispatched");
                Ok(())
            }
            Err(err) => {
                self.notifier
                    .notify(&format!("Save failed: {err}"), NoticeKind::Error);
                Err(err)
            }
        }
    }

    /// Timer event: dispatches an autosave if one is due.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let in_flight = self.coordinator.is_save_in_flight();
        if !self.scheduler.poll(now, self.draft.is_dirty(), in_flight) {
            return;
        }
        let snapshot = self.draft.snapshot();
        match self
            .coordinator
            .save(snapshot, SaveOrigin::Auto, self.epoch, now)
        {
            Ok(ticket) => {
                tracing::info!(ticket, note_id = ?self.draft.id(), "autosave dispatched");
            }
            Err(err) => {
                tracing::debug!(%err, "autosave skipped");
                self.scheduler.on_fire_rejected();
            }
        }
    }

    /// Network-response event.
    pub fn handle_reply(&mut self, reply: SaveReply) {
        if let Some(resolution) = self.coordinator.complete(reply) {
            self.apply_resolution(resolution);
        }
    }

    /// Applies a resolution that has already arrived, without blocking.
    pub fn pump(&mut self) -> bool {
        match self.coordinator.try_complete() {
            Some(resolution) => {
                self.apply_resolution(resolution);
                true
            }
            None => false,
        }
    }

    /// Waits up to `timeout` for the in-flight save. Returns `true` once no
    /// save is outstanding.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        if let Some(resolution) = self.coordinator.wait_complete(timeout) {
            self.apply_resolution(resolution);
        }
        !self.coordinator.is_save_in_flight()
    }

    fn apply_resolution(&mut self, resolution: SaveResolution) {
        let SaveResolution { attempt, result } = resolution;
        if attempt.epoch != self.epoch {
            tracing::info!(
                ticket = attempt.ticket,
                "another note was opened during the save, result not applied"
            );
            self.notify_outcome(&result);
            return;
        }

        self.scheduler.on_save_resolved();
        match &result {
            Ok(record) if self.draft.matches(&attempt.snapshot) => {
                self.draft
                    .mark_persisted(record.id, attempt.snapshot.content.clone());
                self.saved_at = Some(self.clock.now_utc());
                self.scheduler.on_draft_clean();
            }
            Ok(record) => {
                tracing::info!(note_id = %record.id, "draft changed during save, still unsaved");
                self.draft
                    .mark_persisted(record.id, attempt.snapshot.content.clone());
                self.after_mutation();
            }
            Err(SaveError::NotFound(id)) => {
                if self.draft.id() == Some(*id) {
                    tracing::warn!(
                        note_id = %id,
                        "note vanished from store, next save creates it anew"
                    );
                    self.draft.detach();
                }
            }
            Err(err) => {
                tracing::warn!(%err, origin = %attempt.origin, "save failed");
            }
        }
        self.notify_outcome(&result);
    }

    fn notify_outcome(&self, result: &Result<SavedRecord, SaveError>) {
        match result {
            Ok(record) => self.notifier.notify(
                &format!("Note saved successfully: {}", record.id),
                NoticeKind::Info,
            ),
            Err(err) => self
                .notifier
                .notify(&format!("Save failed: {err}"), NoticeKind::Error),
        }
    }

    /// Opens `record`, or an empty draft for `None`. Unsaved edits are handled
    /// according to the switch policy.
    pub fn select_item(&mut self, record: Option<SavedRecord>) {
        if self.draft.is_dirty() {
            match self.switch_policy {
                SwitchPolicy::Discard => {
                    tracing::warn!(note_id = ?self.draft.id(), "discarding unsaved changes");
                }
                SwitchPolicy::SaveFirst => {
                    if let Err(err) = self.manual_save() {
                        tracing::warn!(%err, "save before switch failed, changes discarded");
                    }
                }
            }
        }
        self.switch_to(record);
    }

    pub fn start_new(&mut self) {
        self.select_item(None);
    }

    fn switch_to(&mut self, record: Option<SavedRecord>) {
        self.epoch += 1;
        self.scheduler.cancel();
        match record {
            Some(record) => {
                tracing::info!(note_id = %record.id, "note opened");
                self.draft.load_from(&record);
                self.saved_at = Some(record.last_modified);
            }
            None => {
                self.draft.reset();
                self.saved_at = None;
            }
        }
    }

    pub fn open(&mut self, id: NoteId) -> Result<(), StoreError> {
        match self.store.fetch(id) {
            Ok(record) => {
                self.select_item(Some(record));
                Ok(())
            }
            Err(err) => {
                self.notifier
                    .notify(&format!("Failed to open note: {err}"), NoticeKind::Error);
                Err(err)
            }
        }
    }

    /// Deletes `id` from the store. If it is the open note, the session falls
    /// back to an empty draft without saving.
    pub fn delete(&mut self, id: NoteId) -> Result<(), StoreError> {
        let result = self.store.delete(id);
        match &result {
            Ok(()) => self.notifier.notify("Note deleted", NoticeKind::Info),
            Err(err) => self
                .notifier
                .notify(&format!("Delete failed: {err}"), NoticeKind::Error),
        }
        let gone = matches!(result, Ok(()) | Err(StoreError::NotFound(_)));
        if gone && self.draft.id() == Some(id) {
            self.switch_to(None);
        }
        result
    }
}
