use std::path::Path;

use rollcall_core::NoteTask;

use crate::commands::common::{
    normalize_body, normalize_title, open_store, resolve_note, run_note_task, sync_context,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    body: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    if title.is_none() && body.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let store = open_store(db_path).await?;
    let note = resolve_note(&store, id).await?;

    let new_title = match title {
        Some(title) => normalize_title(&title)?,
        None => note.title.clone(),
    };
    let new_body = match body {
        Some(body) => normalize_body(&body).ok_or(CliError::EmptyBody)?,
        None => note.body.clone(),
    };

    let id = store.update_note(&note.id, &new_title, &new_body).await?;

    // A note the server has never seen still needs its create task; the
    // replace policy folds the new content into it.
    let task = if id.is_temporary() {
        NoteTask::create(id.clone())
    } else {
        NoteTask::update(id.clone())
    };
    let context = sync_context(&store)?;
    let notice = run_note_task(context.as_ref(), task).await;

    println!("{id} ({notice})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use pretty_assertions::assert_eq;
    use rollcall_core::NoteStore;

    fn unique_test_db_path() -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        std::env::temp_dir().join(format!("rollcall-edit-test-{}-{now}.db", std::process::id()))
    }

    fn cleanup_db_files(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_edit_updates_only_the_given_fields() {
        let db_path = unique_test_db_path();
        let id = {
            let store = NoteStore::open_path(&db_path).await.unwrap();
            store.add_note("Old title", "Old body").await.unwrap()
        };

        run_edit(id.as_str(), Some("New title".to_string()), None, &db_path)
            .await
            .unwrap();

        let store = NoteStore::open_path(&db_path).await.unwrap();
        let note = store.get_note(&id).await.unwrap().unwrap();
        assert_eq!(note.title, "New title");
        assert_eq!(note.body, "Old body");

        cleanup_db_files(&db_path);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_edit_requires_a_change() {
        let db_path = unique_test_db_path();
        let error = run_edit("whatever", None, None, &db_path).await.unwrap_err();
        assert!(matches!(error, CliError::NothingToEdit));
        cleanup_db_files(&db_path);
    }
}
