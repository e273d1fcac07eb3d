use std::path::Path;

use chrono::DateTime;

use crate::commands::common::{open_store, resolve_note};
use crate::error::CliError;

pub async fn run_show(id: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let note = resolve_note(&store, id).await?;

    let created = DateTime::from_timestamp_millis(note.created_at).map_or_else(
        || note.created_at.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    let sync_label = if note.id.is_temporary() {
        "pending sync"
    } else {
        "synced"
    };

    println!("id:      {}", note.id);
    println!("created: {created} ({sync_label})");
    println!("title:   {}", note.title);
    println!();
    println!("{}", note.body);
    Ok(())
}
