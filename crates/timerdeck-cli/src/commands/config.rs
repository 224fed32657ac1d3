use clap::Subcommand;
use timerdeck_core::{Config, ConfigError};

use crate::session::{print_json, CliResult, GlobalOpts};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "gesture.long_press_ms", "timers.default_name")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(opts: &GlobalOpts, action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = opts.load_config()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(ConfigError::UnknownKey(key).into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = opts.load_config()?;
            config.set(&key, &value)?;
            opts.save_config(&config)?;
            println!("ok");
        }
        ConfigAction::List => {
            print_json(&opts.load_config()?)?;
        }
        ConfigAction::Reset => {
            opts.save_config(&Config::default())?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
