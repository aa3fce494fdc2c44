use clap::Subcommand;
use eyerest_core::{Config, ConfigKey};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "work_time", "hotkey")
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
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let key: ConfigKey = key.parse()?;
            let config = Config::load_or_default();
            println!("{}", config.get(key));
        }
        ConfigAction::Set { key, value } => {
            // Never overwrite an unreadable file with defaults.
            let mut config = Config::load()?;
            let key = config.set(&key, &value)?;
            config.save()?;
            println!("{key} = {}", config.get(key));
        }
        ConfigAction::List => {
            let config = Config::load_or_default();
            for key in ConfigKey::ALL {
                println!("{key} = {}", config.get(key));
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
