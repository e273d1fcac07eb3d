use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use futures::StreamExt;
use rollcall_core::remote::RemoteNoteClient;
use rollcall_core::sync::{JobId, TaskManager};
use rollcall_core::{Note, NoteId, NoteStore, NoteTask, TaskState};
use serde::Serialize;

use crate::config::CliConfig;
use crate::error::CliError;
use crate::session::SessionStore;

/// How long a command waits for a scheduled task before giving up on the
/// sync report. Covers the full retry budget with margin.
const SYNC_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: i64,
    pub relative_time: String,
    pub synced: bool,
}

/// Remote-sync collaborators, present only when an API base URL is
/// configured.
pub struct SyncContext {
    pub manager: TaskManager,
    pub logged_in: bool,
}

pub fn sync_context(store: &NoteStore) -> Result<Option<SyncContext>, CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let Some(base_url) = config.api_base_url() else {
        return Ok(None);
    };

    let session = SessionStore::new();
    let logged_in = session.logged_in();
    tracing::debug!("Using API at {base_url} (logged_in={logged_in})");
    let client = RemoteNoteClient::new(base_url, Arc::new(session))?;
    Ok(Some(SyncContext {
        manager: TaskManager::new(store.clone(), Arc::new(client)),
        logged_in,
    }))
}

/// Schedule a per-note task and wait for its terminal state, returning the
/// notice the command appends to its output. The local write has already
/// happened; nothing here can lose it.
pub async fn run_note_task(context: Option<&SyncContext>, task: NoteTask) -> &'static str {
    let Some(context) = context else {
        return "not synced (API not configured)";
    };
    if !context.logged_in {
        return "not logged in (kept locally)";
    }

    let job = context.manager.schedule_task(task);
    match wait_for_task(&context.manager, job).await {
        Some(TaskState::Completed) => "synced",
        Some(TaskState::Cancelled) => "sync cancelled (kept locally)",
        _ => "sync failed (kept locally)",
    }
}

pub async fn wait_for_task(manager: &TaskManager, job: JobId) -> Option<TaskState> {
    let states = tokio::time::timeout(
        SYNC_WAIT_TIMEOUT,
        manager.observe_task(job).collect::<Vec<_>>(),
    )
    .await
    .ok()?;
    states.last().copied()
}

pub async fn open_store(db_path: &Path) -> Result<NoteStore, CliError> {
    Ok(NoteStore::open_path(db_path).await?)
}

/// Resolve a note by exact ID first, then by unique ID prefix.
pub async fn resolve_note(store: &NoteStore, note_query: &str) -> Result<Note, CliError> {
    let note_query = normalize_note_identifier(note_query)?;

    if let Some(note) = store.get_note(&NoteId::from(note_query.as_str())).await? {
        return Ok(note);
    }

    let mut matches: Vec<Note> = store
        .list_notes()
        .await?
        .into_iter()
        .filter(|note| note.id.as_str().starts_with(&note_query))
        .collect();

    match matches.len() {
        0 => Err(CliError::NoteNotFound(note_query)),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let title = truncate(&note.title, 30);
            let relative_time = format_relative_time(note.created_at, now_ms);
            let marker = if note.id.is_temporary() { "*" } else { " " };
            format!("{short_id:<14}{marker} {title:<30}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        body: note.body.clone(),
        created_at: note.created_at,
        relative_time: format_relative_time(note.created_at, now_ms),
        synced: !note.id.is_temporary(),
    }
}

pub fn short_id(id: &NoteId) -> String {
    id.as_str().chars().take(14).collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_title(title: &str) -> Result<String, CliError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::NoteNotFound(String::new()))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve the note body from the `--body` flag, piped stdin, or $EDITOR.
pub fn resolve_note_body(body_flag: Option<String>) -> Result<String, CliError> {
    if let Some(body) = body_flag.and_then(|body| normalize_body(&body)) {
        return Ok(body);
    }

    if let Some(body) = read_piped_stdin()? {
        return Ok(body);
    }

    if let Some(body) = capture_editor_input()? {
        return Ok(body);
    }

    Err(CliError::EmptyBody)
}

pub fn normalize_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_body(&buffer))
}

fn capture_editor_input() -> Result<Option<String>, CliError> {
    capture_editor_input_with_initial("")
}

pub fn capture_editor_input_with_initial(initial_content: &str) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_body = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_body(&note_body))
}

fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // Fallback for editor commands with args, e.g. "code --wait"
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("rollcall-note-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("ROLLCALL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rollcall")
        .join("rollcall.db")
}
