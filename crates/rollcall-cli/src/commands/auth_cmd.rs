use std::path::Path;

use rollcall_core::auth::{AuthClient, SessionPersistence};

use crate::cli::AuthCommands;
use crate::commands::common::{open_store, sync_context};
use crate::config::CliConfig;
use crate::error::CliError;
use crate::session::SessionStore;

pub async fn run_auth(command: AuthCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        AuthCommands::Register {
            name,
            email,
            password,
        } => {
            let client = auth_client()?;
            let credential = client
                .register(&name, &email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            SessionStore::new()
                .save_session(&credential)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Registered and signed in as {email}");
            Ok(())
        }
        AuthCommands::Login { email, password } => {
            let client = auth_client()?;
            let credential = client
                .login(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            SessionStore::new()
                .save_session(&credential)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed in as {email}");
            Ok(())
        }
        AuthCommands::Status => {
            if SessionStore::new().logged_in() {
                println!("Signed in.");
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let store = open_store(db_path).await?;
            if let Some(context) = sync_context(&store)? {
                context.manager.abort_all_tasks();
            }
            store.delete_all_notes().await?;
            SessionStore::new()
                .clear_session()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed out; local notes cleared");
            Ok(())
        }
    }
}

fn auth_client() -> Result<AuthClient, CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let base_url = config.api_base_url().ok_or(CliError::ApiNotConfigured)?;
    AuthClient::new(base_url).map_err(|error| CliError::Auth(error.to_string()))
}
