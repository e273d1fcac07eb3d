//! Local note store service shared across clients.
//!
//! Wraps the database behind a thread-safe handle and layers the app-level
//! error policy on top of the raw repository: mutations report static
//! user-facing messages, list reads never hard-fail, and reads are exposed
//! as reactive streams that re-emit whenever the store changes.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::{watch, Mutex};

use crate::db::{Database, LibSqlNoteRepository, NoteRepository};
use crate::error::{Error, Result};
use crate::models::{Note, NoteId};

/// Thread-safe service for local note persistence.
#[derive(Clone)]
pub struct NoteStore {
    db: Arc<Mutex<Database>>,
    revision: Arc<watch::Sender<u64>>,
}

impl NoteStore {
    /// Open a note store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory note store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        let (revision, _) = watch::channel(0_u64);
        Self {
            db: Arc::new(Mutex::new(db)),
            revision: Arc::new(revision),
        }
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|version| *version += 1);
    }

    /// Create a new note under a temporary ID with the current timestamp.
    pub async fn add_note(&self, title: &str, body: &str) -> Result<NoteId> {
        let note = Note::new(title, body);

        let inserted = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.insert(&note).await
        };

        if let Err(error) = inserted {
            tracing::warn!("Failed to persist new note: {error}");
            return Err(Error::store("Unable to create a new note"));
        }

        self.bump_revision();
        Ok(note.id)
    }

    /// Fetch a note by ID.
    pub async fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let db = self.db.lock().await;
        let repo = LibSqlNoteRepository::new(db.connection());
        repo.get(id).await
    }

    /// List all notes newest-first. Storage failures surface as an empty
    /// list, never as an error.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let listed = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.list().await
        };

        match listed {
            Ok(notes) => Ok(notes),
            Err(error) => {
                tracing::warn!("Failed to list notes, serving empty list: {error}");
                Ok(Vec::new())
            }
        }
    }

    /// Update a note's title and body.
    pub async fn update_note(&self, id: &NoteId, title: &str, body: &str) -> Result<NoteId> {
        let updated = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.update(id, title, body).await
        };

        if let Err(error) = updated {
            tracing::warn!("Failed to update note {id}: {error}");
            return Err(Error::store("Unable to update the note"));
        }

        self.bump_revision();
        Ok(id.clone())
    }

    /// Delete a note by ID.
    pub async fn delete_note(&self, id: &NoteId) -> Result<NoteId> {
        let deleted = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.delete(id).await
        };

        if let Err(error) = deleted {
            tracing::warn!("Failed to delete note {id}: {error}");
            return Err(Error::store("Unable to delete the note"));
        }

        self.bump_revision();
        Ok(id.clone())
    }

    /// Delete every note (logout path).
    pub async fn delete_all_notes(&self) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.delete_all().await?;
        }
        self.bump_revision();
        Ok(())
    }

    /// Insert or replace a batch of notes. Used to merge server state into
    /// the local store during bulk sync.
    pub async fn upsert_notes(&self, notes: &[Note]) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.upsert_all(notes).await?;
        }
        self.bump_revision();
        Ok(())
    }

    /// Promote a temporary note ID to the server-issued one, in place.
    pub async fn reassign_id(&self, old_id: &NoteId, new_id: &NoteId) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.reassign(old_id, new_id).await?;
        }
        self.bump_revision();
        Ok(())
    }

    /// Reactive single-note lookup. Emits the note when present and again on
    /// every change; emits nothing while the note is absent.
    pub fn note_by_id(&self, id: NoteId) -> impl Stream<Item = Note> + Send + 'static {
        let store = self.clone();
        let rx = self.revision.subscribe();

        stream::unfold((store, rx, id, None::<Note>), |state| async move {
            let (store, mut rx, id, mut last) = state;
            loop {
                // Mark the current revision seen before querying so a write
                // racing the query wakes the next `changed()` immediately.
                rx.borrow_and_update();

                let current = store.get_note(&id).await.ok().flatten();
                if let Some(note) = current {
                    if last.as_ref() != Some(&note) {
                        last = Some(note.clone());
                        return Some((note, (store, rx, id, last)));
                    }
                }

                if rx.changed().await.is_err() {
                    return None;
                }
            }
        })
    }

    /// Reactive full-table read ordered newest-first. Re-emits on every store
    /// revision; storage failures yield an empty success list.
    pub fn all_notes(&self) -> impl Stream<Item = Result<Vec<Note>>> + Send + 'static {
        let store = self.clone();
        let rx = self.revision.subscribe();

        stream::unfold((store, rx, true), |state| async move {
            let (store, mut rx, first) = state;
            if !first && rx.changed().await.is_err() {
                return None;
            }
            rx.borrow_and_update();

            let notes = store.list_notes().await;
            Some((notes, (store, rx, false)))
        })
    }
}
