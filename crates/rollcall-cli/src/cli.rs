use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Offline-first attendance notes with background sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(long, value_name = "TITLE")]
        title: String,
        /// Note body (falls back to piped stdin, then $EDITOR)
        #[arg(long, value_name = "BODY")]
        body: Option<String>,
    },
    /// List all notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single note
    Show {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Edit an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title (unchanged when omitted)
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,
        /// New body (unchanged when omitted)
        #[arg(long, value_name = "BODY")]
        body: Option<String>,
    },
    /// Delete an existing note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Pull the latest notes from the server into the local store
    Sync,
    /// Manage the signed-in session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Register a new account and store the session in the keychain
    Register {
        /// Display name
        #[arg(long, value_name = "NAME")]
        name: String,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Login with email/password and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show whether a session is stored
    Status,
    /// Clear the session, abort pending tasks, and wipe local notes
    Logout,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the CLI config
    Init {
        /// API base URL (e.g. <https://api.example.com>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
    },
    /// Print the current config
    Show,
}
