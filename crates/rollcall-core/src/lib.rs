//! rollcall-core - Core library for rollcall
//!
//! This crate contains the shared models, local note store, remote note
//! client, and the background sync machinery used by all rollcall interfaces.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Note, NoteId, NoteTask, TaskAction, TaskState};
pub use store::NoteStore;
