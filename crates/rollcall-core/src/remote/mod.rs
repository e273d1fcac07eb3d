//! Remote note client: REST mirror of the local CRUD surface.
//!
//! The client is a stateless read/write-through layer. Every response is
//! wrapped in the backend's envelope (`status` + `message` + payload); only
//! `SUCCESS` maps to `Ok`, everything else carries the server message.
//! Retries are the task coordinator's responsibility, not ours.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::models::{Note, NoteId};

/// Network timeout matching the platform defaults for read/write.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Status discriminant of the wire envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
    Unauthorized,
    NotFound,
}

#[derive(Debug, Serialize)]
struct NoteRequest<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteNote {
    id: String,
    title: String,
    body: String,
    created: i64,
}

impl From<RemoteNote> for Note {
    fn from(remote: RemoteNote) -> Self {
        Self {
            id: NoteId::from(remote.id),
            title: remote.title,
            body: remote.body,
            created_at: remote.created,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NotesResponse {
    status: ResponseStatus,
    message: Option<String>,
    notes: Option<Vec<RemoteNote>>,
}

#[derive(Debug, Deserialize)]
struct NoteMutationResponse {
    status: ResponseStatus,
    message: Option<String>,
    #[serde(rename = "noteId")]
    note_id: Option<String>,
}

/// Remote CRUD surface the sync machinery runs against. A seam so workers
/// can be exercised without a live backend.
#[async_trait]
pub trait NoteBackend: Send + Sync + 'static {
    /// Fetch the full remote note list.
    async fn fetch_notes(&self) -> Result<Vec<Note>>;

    /// Create a note remotely; returns the server-assigned note ID.
    async fn create_note(&self, title: &str, body: &str) -> Result<String>;

    /// Update a note remotely; returns the note ID.
    async fn update_note(&self, id: &NoteId, title: &str, body: &str) -> Result<String>;

    /// Delete a note remotely; returns the note ID.
    async fn delete_note(&self, id: &NoteId) -> Result<String>;
}

/// reqwest-backed implementation of [`NoteBackend`].
#[derive(Clone)]
pub struct RemoteNoteClient {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl RemoteNoteClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            tokens,
        })
    }

    /// Attach the bearer token when a session exists; otherwise the request
    /// goes out bare and the server rejects it with `UNAUTHORIZED`.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn try_fetch_notes(&self) -> Result<Vec<Note>> {
        let response = self
            .authorized(self.client.get(format!("{}/notes", self.base_url)))
            .send()
            .await?
            .json::<NotesResponse>()
            .await?;

        match response.status {
            ResponseStatus::Success => Ok(response
                .notes
                .unwrap_or_default()
                .into_iter()
                .map(Note::from)
                .collect()),
            _ => Err(Error::remote(envelope_message(response.message))),
        }
    }

    async fn try_mutation(&self, request: RequestBuilder) -> Result<String> {
        let response = self
            .authorized(request)
            .send()
            .await?
            .json::<NoteMutationResponse>()
            .await?;

        note_id_from_response(response)
    }
}

#[async_trait]
impl NoteBackend for RemoteNoteClient {
    async fn fetch_notes(&self) -> Result<Vec<Note>> {
        match self.try_fetch_notes().await {
            Ok(notes) => Ok(notes),
            Err(error @ Error::Remote(_)) => Err(error),
            Err(error) => {
                tracing::warn!("Fetching remote notes failed: {error}");
                Err(Error::remote("Can't sync latest notes"))
            }
        }
    }

    async fn create_note(&self, title: &str, body: &str) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/note/new", self.base_url))
            .json(&NoteRequest { title, body });

        self.try_mutation(request).await.map_err(generic_fallback)
    }

    async fn update_note(&self, id: &NoteId, title: &str, body: &str) -> Result<String> {
        let request = self
            .client
            .put(format!("{}/note/{}", self.base_url, id))
            .json(&NoteRequest { title, body });

        self.try_mutation(request).await.map_err(generic_fallback)
    }

    async fn delete_note(&self, id: &NoteId) -> Result<String> {
        let request = self.client.delete(format!("{}/note/{}", self.base_url, id));

        self.try_mutation(request).await.map_err(generic_fallback)
    }
}

fn note_id_from_response(response: NoteMutationResponse) -> Result<String> {
    match response.status {
        ResponseStatus::Success => response
            .note_id
            .ok_or_else(|| Error::remote("response did not include a note ID")),
        _ => Err(Error::remote(envelope_message(response.message))),
    }
}

fn envelope_message(message: Option<String>) -> String {
    message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| "Something went wrong!".to_string())
}

/// Envelope errors keep the server message; transport and decode failures
/// collapse to the generic message.
fn generic_fallback(error: Error) -> Error {
    match error {
        remote @ Error::Remote(_) => remote,
        other => {
            tracing::warn!("Remote note call failed: {other}");
            Error::remote("Something went wrong!")
        }
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("base URL must not be empty".into()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".into(),
        ))
    }
}
