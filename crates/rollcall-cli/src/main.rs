//! rollcall CLI - attendance notes from the terminal
//!
//! Writes land in the local store first; a background task pushes each
//! change to the server when a session is available.

mod cli;
mod commands;
mod config;
mod error;
mod session;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rollcall=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add { title, body } => commands::add::run_add(&title, body, &db_path).await,
        Commands::List { json } => commands::list::run_list(json, &db_path).await,
        Commands::Show { id } => commands::show::run_show(&id, &db_path).await,
        Commands::Edit { id, title, body } => {
            commands::edit::run_edit(&id, title, body, &db_path).await
        }
        Commands::Delete { id } => commands::delete::run_delete(&id, &db_path).await,
        Commands::Sync => commands::sync::run_sync(&db_path).await,
        Commands::Auth { command } => commands::auth_cmd::run_auth(command, &db_path).await,
        Commands::Config { command } => commands::config::run_config(command),
    }
}
