//! `config` subcommands.

use std::error::Error;
use std::path::Path;

use clap::Subcommand;

use crate::core::config::keys::KEYS;
use crate::core::config::{path_display, Config};

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print every key and its value
    Show,
    /// Print the path of the configuration file
    Path,
    /// Set a configuration key
    Set {
        key: String,
        /// Value; lists such as enabled_tools are comma separated
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Remove a configuration key
    Unset { key: String },
}

pub fn run_config(
    action: ConfigAction,
    config_path: &Path,
    mut config: Config,
) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => print!("{}", format_config(&config, config_path)?),
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Set { key, value } => {
            let key = config.set_value(&key, &value)?;
            config.save_to_path(config_path)?;
            println!("✅ Set {key} to: {value}");
        }
        ConfigAction::Unset { key } => {
            let key = config.unset_value(&key)?;
            config.save_to_path(config_path)?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}

fn format_config(config: &Config, config_path: &Path) -> Result<String, Box<dyn Error>> {
    let mut out = format!("Current configuration ({}):\n", path_display(config_path));
    for key in KEYS {
        let value = config
            .display_value(key)?
            .unwrap_or_else(|| "(unset)".to_string());
        out.push_str(&format!("  {key}: {value}\n"));
    }
    Ok(out)
}
