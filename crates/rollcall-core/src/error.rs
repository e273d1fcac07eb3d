//! Error types for rollcall-core

use thiserror::Error;

/// Result type alias using rollcall-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rollcall-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store failure, carries the per-operation user-facing message
    #[error("{0}")]
    Store(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Remote API reported a non-success status
    #[error("{0}")]
    Remote(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Store-boundary helper: swallow the underlying cause and keep only the
    /// user-facing message.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Remote-boundary helper for non-success envelope statuses.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }
}
