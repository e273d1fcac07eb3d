use crate::cli::ConfigCommands;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { api_base_url } => {
            let mut config = CliConfig::load().map_err(CliError::Config)?;
            if let Some(url) = api_base_url {
                config.api_base_url = Some(url);
            }
            let path = config.save().map_err(CliError::Config)?;
            println!("Config written to {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = CliConfig::load().map_err(CliError::Config)?;
            println!("config file:  {}", default_config_path().display());
            println!(
                "api_base_url: {}",
                config.api_base_url.as_deref().unwrap_or("(not set)")
            );
            Ok(())
        }
    }
}
