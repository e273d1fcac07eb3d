use std::path::Path;

use rollcall_core::NoteTask;

use crate::commands::common::{open_store, resolve_note, run_note_task, sync_context};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let note = resolve_note(&store, id).await?;
    let was_temporary = note.id.is_temporary();

    let id = store.delete_note(&note.id).await?;

    // Temporary notes never reached the server, so there is nothing to
    // delete remotely.
    if was_temporary {
        println!("{id} (deleted locally, never synced)");
        return Ok(());
    }

    let context = sync_context(&store)?;
    let notice = run_note_task(context.as_ref(), NoteTask::delete(id.clone())).await;

    println!("{id} ({notice})");
    Ok(())
}
