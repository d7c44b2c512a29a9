//! In-memory editable note and the last content known to be stored.

use crate::storage::{NoteId, SavedRecord};

/// Title/body pair. Compared as a unit when deciding dirtiness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    pub title: String,
    pub body: String,
}

impl Content {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Immutable copy of the draft taken when a save starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSnapshot {
    pub id: Option<NoteId>,
    pub content: Content,
}

impl DraftSnapshot {
    pub fn title(&self) -> &str {
        &self.content.title
    }

    pub fn body(&self) -> &str {
        &self.content.body
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftState {
    current: Content,
    persisted: Content,
    id: Option<NoteId>,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: &SavedRecord) -> Self {
        let mut draft = Self::new();
        draft.load_from(record);
        draft
    }

    pub fn title(&self) -> &str {
        &self.current.title
    }

    pub fn body(&self) -> &str {
        &self.current.body
    }

    pub fn id(&self) -> Option<NoteId> {
        self.id
    }

    pub fn persisted(&self) -> &Content {
        &self.persisted
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.current.title = title.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.current.body = body.into();
    }

    pub fn load_from(&mut self, record: &SavedRecord) {
        self.current = Content::new(record.title.clone(), record.body.clone());
        self.persisted = self.current.clone();
        self.id = Some(record.id);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.persisted
    }

    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            id: self.id,
            content: self.current.clone(),
        }
    }

    /// True when the current content is exactly what `snapshot` captured.
    pub fn matches(&self, snapshot: &DraftSnapshot) -> bool {
        self.current == snapshot.content
    }

    /// Records that `content` is now durably stored under `id`.
    pub fn mark_persisted(&mut self, id: NoteId, content: Content) {
        self.id = Some(id);
        self.persisted = content;
    }

    /// Forgets the stored identity while keeping what the user typed, so the
    /// next save creates a fresh note.
    pub fn detach(&mut self) {
        self.id = None;
        self.persisted = Content::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(id: i64, title: &str, body: &str) -> SavedRecord {
        SavedRecord {
            id: NoteId(id),
            title: title.into(),
            body: body.into(),
            last_modified: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn new_draft_is_clean() {
        let draft = DraftState::new();
        assert!(!draft.is_dirty());
        assert_eq!(draft.id(), None);
    }

    #[test]
    fn dirtiness_follows_final_content_not_history() {
        let mut draft = DraftState::from_record(&record(7, "X", "Y"));
        assert!(!draft.is_dirty());

        draft.set_body("Y2");
        assert!(draft.is_dirty());
        draft.set_title("X2");
        draft.set_title("X");
        assert!(draft.is_dirty());
        draft.set_body("Y");
        assert!(!draft.is_dirty());
    }

    #[test]
    fn setters_keep_whitespace_verbatim() {
        let mut draft = DraftState::from_record(&record(1, "T", "B"));
        draft.set_title("T ");
        assert_eq!(draft.title(), "T ");
        assert!(draft.is_dirty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut draft = DraftState::new();
        draft.set_title("A");
        draft.set_body("B");
        let snapshot = draft.snapshot();
        draft.set_body("B, more");

        assert_eq!(snapshot.body(), "B");
        assert!(!draft.matches(&snapshot));
    }

    #[test]
    fn persisting_an_older_snapshot_keeps_draft_dirty() {
        let mut draft = DraftState::from_record(&record(7, "X", "Y"));
        draft.set_body("Y2");
        let snapshot = draft.snapshot();
        draft.set_body("Y");
        assert!(!draft.is_dirty());

        draft.mark_persisted(NoteId(7), snapshot.content);
        assert_eq!(draft.persisted().body, "Y2");
        assert!(draft.is_dirty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut draft = DraftState::from_record(&record(3, "T", "B"));
        draft.set_body("changed");
        draft.reset();
        assert_eq!(draft.title(), "");
        assert_eq!(draft.body(), "");
        assert_eq!(draft.id(), None);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn detach_keeps_content_and_leaves_draft_dirty() {
        let mut draft = DraftState::from_record(&record(3, "T", "B"));
        draft.detach();
        assert_eq!(draft.id(), None);
        assert_eq!(draft.body(), "B");
        assert!(draft.is_dirty());
    }
}
