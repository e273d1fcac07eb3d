//! Database layer for rollcall

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlNoteRepository, NoteRepository};
