//! Sync task model and lifecycle states

use serde::{Deserialize, Serialize};

use super::NoteId;

/// Remote action a sync task must perform for one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    Create,
    Update,
    Delete,
}

/// A unit of reconciliation work: propagate one locally originated mutation
/// of one note to the remote service. At most one pending task exists per
/// note ID; scheduling a second one replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTask {
    pub note_id: NoteId,
    pub action: TaskAction,
}

impl NoteTask {
    #[must_use]
    pub fn create(note_id: NoteId) -> Self {
        Self {
            note_id,
            action: TaskAction::Create,
        }
    }

    #[must_use]
    pub fn update(note_id: NoteId) -> Self {
        Self {
            note_id,
            action: TaskAction::Update,
        }
    }

    #[must_use]
    pub fn delete(note_id: NoteId) -> Self {
        Self {
            note_id,
            action: TaskAction::Delete,
        }
    }
}

/// App-level task state, a lossy projection of the scheduler's richer
/// lifecycle. `Completed`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Scheduled,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    /// Whether no further transitions can occur from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}
