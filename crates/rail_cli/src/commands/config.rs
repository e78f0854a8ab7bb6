//! Config command - Show or edit the user configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::GlobalArgs;
use crate::config::ConfigManager;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the configuration
    Show,

    /// Store the API token
    #[command(name = "set-token")]
    SetToken { token: String },

    /// Restore the default configuration
    Reset,

    /// Print the config file path
    Path,
}

pub async fn execute(global: &GlobalArgs, args: ConfigArgs) -> Result<()> {
    let mut manager = match &global.config {
        Some(path) => ConfigManager::open(path)?,
        None => ConfigManager::open_default()?,
    };

    match args.action {
        ConfigAction::Show => {
            let mut shown = manager.config().clone();
            if shown.auth.api_token.is_some() {
                shown.auth.api_token = Some("********".to_string());
            }
            if shown.auth.api_refresh_token.is_some() {
                shown.auth.api_refresh_token = Some("********".to_string());
            }
            println!("# {}", manager.path().display());
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::SetToken { token } => {
            manager.set_api_token(token)?;
            println!("✅ API token saved to {}", manager.path().display());
        }
        ConfigAction::Reset => {
            manager.reset()?;
            println!("✅ Config reset: {}", manager.path().display());
        }
        ConfigAction::Path => println!("{}", manager.path().display()),
    }

    Ok(())
}
