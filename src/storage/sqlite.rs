use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use super::{
    schema, validate_content, NoteId, NoteStore, NoteSummary, SavedRecord, StoreError,
    StoreHealth, StoreResult,
};
use crate::config::StorageOptions;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// SQLite-backed note store. Each call opens its own connection so the handle
/// can be cloned freely into the save worker.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStore {
    pub fn init(options: &StorageOptions) -> anyhow::Result<Self> {
        let db_path = &options.database_path;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        prepare_connection(&conn, options)?;
        schema::apply(&conn)?;
        tracing::debug!(path = %db_path.display(), "note store ready");
        Ok(Self {
            db_path: Arc::new(db_path.clone()),
            options: Arc::new(options.clone()),
        })
    }

    fn connect(&self) -> anyhow::Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    fn with_connection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self
            .connect()
            .map_err(|err| StoreError::Unavailable(format!("{err:#}")))?;
        f(&conn)
    }

    fn try_list(&self) -> StoreResult<Vec<NoteSummary>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, length(CAST(body AS BLOB)), updated_at
                 FROM notes
                 ORDER BY updated_at DESC, id DESC",
            )?;
            let notes = stmt
                .query_map([], |row| {
                    let size: i64 = row.get(2)?;
                    Ok(NoteSummary {
                        id: NoteId(row.get(0)?),
                        title: row.get(1)?,
                        size: usize::try_from(size).unwrap_or_default(),
                        last_modified: timestamp_from(row.get(3)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }
}

impl NoteStore for SqliteStore {
    fn create_or_update(
        &self,
        id: Option<NoteId>,
        title: &str,
        body: &str,
    ) -> StoreResult<SavedRecord> {
        validate_content(title, body)?;
        let stamp = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            let id = match id {
                None => {
                    conn.execute(
                        "INSERT INTO notes (title, body, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        params![title, body, stamp],
                    )?;
                    NoteId(conn.last_insert_rowid())
                }
                Some(id) => {
                    let updated = conn.execute(
                        "UPDATE notes SET title = ?1, body = ?2, updated_at = ?3 WHERE id = ?4",
                        params![title, body, stamp, id.0],
                    )?;
                    if updated == 0 {
                        return Err(StoreError::NotFound(id));
                    }
                    id
                }
            };
            Ok(SavedRecord {
                id,
                title: title.to_owned(),
                body: body.to_owned(),
                last_modified: timestamp_from(stamp),
            })
        })
    }

    fn fetch(&self, id: NoteId) -> StoreResult<SavedRecord> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, title, body, updated_at FROM notes WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(SavedRecord {
                        id: NoteId(row.get(0)?),
                        title: row.get(1)?,
                        body: row.get(2)?,
                        last_modified: timestamp_from(row.get(3)?),
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
    }

    fn list(&self) -> Vec<NoteSummary> {
        match self.try_list() {
            Ok(notes) => notes,
            Err(err) => {
                tracing::warn!(?err, "listing notes failed, returning empty listing");
                Vec::new()
            }
        }
    }

    fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM notes WHERE id = ?1", [id.0])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn health(&self) -> StoreHealth {
        let probe = self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        });
        match probe {
            Ok(()) => StoreHealth::Connected,
            Err(err) => {
                tracing::warn!(?err, "note store health probe failed");
                StoreHealth::Unreachable
            }
        }
    }
}

fn prepare_connection(conn: &Connection, options: &StorageOptions) -> anyhow::Result<()> {
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))
        .context("setting busy timeout")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        options.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn timestamp_from(secs: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn init_store() -> anyhow::Result<(TempDir, SqliteStore)> {
        let temp = TempDir::new()?;
        let options = StorageOptions {
            database_path: temp.path().join("data").join("notes.db"),
            ..StorageOptions::default()
        };
        let store = SqliteStore::init(&options)?;
        Ok((temp, store))
    }

    #[test]
    fn create_then_update_keeps_identifier() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let created = store.create_or_update(None, "Groceries", "milk")?;
        let updated = store.create_or_update(Some(created.id), "Groceries", "milk, eggs")?;
        assert_eq!(updated.id, created.id);

        let fetched = store.fetch(created.id)?;
        assert_eq!(fetched.title, "Groceries");
        assert_eq!(fetched.body, "milk, eggs");
        Ok(())
    }

    #[test]
    fn update_of_missing_note_is_not_found() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let err = store
            .create_or_update(Some(NoteId(42)), "Title", "Body")
            .unwrap_err();
        assert_matches!(err, StoreError::NotFound(NoteId(42)));
        Ok(())
    }

    #[test]
    fn blank_content_is_rejected() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        assert_matches!(
            store.create_or_update(None, "   ", "body"),
            Err(StoreError::Rejected(_))
        );
        assert_matches!(
            store.create_or_update(None, "title", "\n\t"),
            Err(StoreError::Rejected(_))
        );
        assert!(store.list().is_empty());
        Ok(())
    }

    #[test]
    fn list_reports_byte_size_and_delete_removes() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let first = store.create_or_update(None, "First", "héllo")?;
        let second = store.create_or_update(None, "Second", "abc")?;

        let listing = store.list();
        assert_eq!(listing.len(), 2);
        let first_summary = listing
            .iter()
            .find(|note| note.id == first.id)
            .expect("first note listed");
        assert_eq!(first_summary.size, "héllo".len());

        store.delete(second.id)?;
        assert_matches!(store.delete(second.id), Err(StoreError::NotFound(_)));
        assert_matches!(store.fetch(second.id), Err(StoreError::NotFound(_)));
        assert_eq!(store.list().len(), 1);
        Ok(())
    }

    #[test]
    fn health_reports_connected() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        assert_eq!(store.health(), StoreHealth::Connected);
        Ok(())
    }
}
