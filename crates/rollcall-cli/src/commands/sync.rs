use std::path::Path;

use rollcall_core::TaskState;

use crate::commands::common::{open_store, sync_context, wait_for_task};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let context = sync_context(&store)?.ok_or(CliError::ApiNotConfigured)?;
    if !context.logged_in {
        return Err(CliError::Auth(
            "Not signed in. Run `rollcall auth login` first.".to_string(),
        ));
    }

    let job = context.manager.sync_notes();
    match wait_for_task(&context.manager, job).await {
        Some(TaskState::Completed) => {
            println!("Sync completed");
            Ok(())
        }
        _ => Err(CliError::SyncFailed("Can't sync latest notes".to_string())),
    }
}
