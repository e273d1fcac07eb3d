use std::path::Path;

use rollcall_core::NoteTask;

use crate::commands::common::{
    normalize_title, open_store, resolve_note_body, run_note_task, sync_context,
};
use crate::error::CliError;

pub async fn run_add(title: &str, body: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let title = normalize_title(title)?;
    let body = resolve_note_body(body)?;

    let store = open_store(db_path).await?;
    let id = store.add_note(&title, &body).await?;

    let context = sync_context(&store)?;
    let notice = run_note_task(context.as_ref(), NoteTask::create(id.clone())).await;

    println!("{id} ({notice})");
    Ok(())
}
