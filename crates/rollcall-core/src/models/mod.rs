//! Domain models for rollcall

mod note;
mod task;

pub use note::{Note, NoteId};
pub use task::{NoteTask, TaskAction, TaskState};
