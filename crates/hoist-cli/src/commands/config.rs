//! Config command implementation.

use anyhow::Result;

use hoist_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = super::load_config();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
            Ok(())
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Configuration reset to defaults");
            println!("  {}", Config::config_path().display());
            Ok(())
        }
    }
}
