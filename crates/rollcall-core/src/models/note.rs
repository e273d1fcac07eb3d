//! Note model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix marking identifiers that were generated locally and not yet
/// accepted by the remote service.
const TEMP_ID_PREFIX: &str = "TMP";

/// A unique identifier for a note.
///
/// Two namespaces exist: temporary IDs (`TMP-<uuid>`, assigned at creation
/// before the server has accepted the note) and permanent IDs issued by the
/// remote service. A note holds exactly one active ID at a time; the
/// temporary one is replaced in place once the create-sync succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a fresh temporary ID for a locally created note.
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}-{}", Uuid::new_v4()))
    }

    /// Whether this ID is still in the temporary namespace.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    /// Borrow the string representation of this ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Short title
    pub title: String,
    /// Body text
    pub body: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Note {
    /// Create a new local note with a temporary ID and the current timestamp.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: NoteId::temporary(),
            title: title.into(),
            body: body.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Check if the note carries no visible content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_unique() {
        let id1 = NoteId::temporary();
        let id2 = NoteId::temporary();
        assert_ne!(id1, id2);
    }

    #[test]
    fn temporary_ids_carry_the_marker() {
        let id = NoteId::temporary();
        assert!(id.is_temporary());
        assert!(id.as_str().starts_with("TMP-"));
    }

    #[test]
    fn server_ids_are_not_temporary() {
        let id = NoteId::from("5ed1aca3a8c6a63a3c1b3f91");
        assert!(!id.is_temporary());
    }

    #[test]
    fn new_note_has_temporary_id_and_timestamp() {
        let note = Note::new("Title", "Body");
        assert!(note.id.is_temporary());
        assert_eq!(note.title, "Title");
        assert_eq!(note.body, "Body");
        assert!(note.created_at > 0);
    }

    #[test]
    fn is_empty_ignores_whitespace() {
        assert!(Note::new("  ", "\n").is_empty());
        assert!(!Note::new("", "hello").is_empty());
    }
}
