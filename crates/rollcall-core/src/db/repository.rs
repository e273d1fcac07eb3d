//! Note repository implementation

use async_trait::async_trait;
use libsql::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{Note, NoteId};

/// Trait for note storage operations
#[async_trait]
pub trait NoteRepository {
    /// Insert a new note row
    async fn insert(&self, note: &Note) -> Result<()>;

    /// Get a note by ID
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// List all notes, newest first
    async fn list(&self) -> Result<Vec<Note>>;

    /// Update a note's title and body
    async fn update(&self, id: &NoteId, title: &str, body: &str) -> Result<()>;

    /// Delete a note by ID
    async fn delete(&self, id: &NoteId) -> Result<()>;

    /// Delete every note
    async fn delete_all(&self) -> Result<()>;

    /// Insert or replace a batch of notes (server-state merge)
    async fn upsert_all(&self, notes: &[Note]) -> Result<()>;

    /// Move a note from one ID to another (temporary -> permanent promotion)
    async fn reassign(&self, old_id: &NoteId, new_id: &NoteId) -> Result<()>;
}

/// libSQL implementation of `NoteRepository`
pub struct LibSqlNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &Row) -> Result<Note> {
        let id: String = row.get(0)?;
        Ok(Note {
            id: NoteId::from(id),
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[async_trait]
impl NoteRepository for LibSqlNoteRepository<'_> {
    async fn insert(&self, note: &Note) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO notes (id, title, body, created_at) VALUES (?, ?, ?, ?)",
                params![
                    note.id.as_str(),
                    note.title.as_str(),
                    note.body.as_str(),
                    note.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, body, created_at FROM notes WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Note>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, body, created_at FROM notes ORDER BY created_at DESC",
                (),
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::parse_note(&row)?);
        }

        Ok(notes)
    }

    async fn update(&self, id: &NoteId, title: &str, body: &str) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE notes SET title = ?, body = ? WHERE id = ?",
                params![title, body, id.as_str()],
            )
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM notes", ()).await?;
        Ok(())
    }

    async fn upsert_all(&self, notes: &[Note]) -> Result<()> {
        for note in notes {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO notes (id, title, body, created_at) VALUES (?, ?, ?, ?)",
                    params![
                        note.id.as_str(),
                        note.title.as_str(),
                        note.body.as_str(),
                        note.created_at
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn reassign(&self, old_id: &NoteId, new_id: &NoteId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE notes SET id = ? WHERE id = ?",
                params![new_id.as_str(), old_id.as_str()],
            )
            .await?;
        Ok(())
    }
}
