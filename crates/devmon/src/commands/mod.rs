//! Command dispatch.

pub mod check;
pub mod config_cmd;
pub mod run;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a command; no subcommand means `run`.
pub async fn dispatch(cmd: Option<Command>, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd.unwrap_or(Command::Run) {
        Command::Run => run::handle(&config::load(global)?).await,
        Command::Check(args) => check::handle(&config::load(global)?, &args).await,
        Command::Config(args) => config_cmd::handle(global, &args),
    }
}
