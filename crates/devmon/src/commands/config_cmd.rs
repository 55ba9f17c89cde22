//! `devmon config`: show the effective configuration.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// `path` never reads a config file, so it works while the file is broken.
pub fn handle(global: &GlobalOpts, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => print!("{}", config::load(global)?.to_redacted_toml()?),
        ConfigCommand::Path => println!("{}", devmon_config::config_path().display()),
    }
    Ok(())
}
