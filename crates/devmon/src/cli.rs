//! Clap derive structures for the `devmon` CLI.
//!
//! Flags override values from the config file and `DEVMON_*` environment.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// devmon -- report devices that stay offline
#[derive(Debug, Parser)]
#[command(
    name = "devmon",
    version,
    about = "Watch a device registry and report devices that stay offline",
    long_about = "Polls the device registry on a fixed interval and reports every\n\
        device that stays offline longer than the device timeout.\n\n\
        Runs the monitor when no subcommand is given.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DEVMON_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Status server listen address
    #[arg(long = "host", env = "DEVMON_LISTEN", global = true, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Error reporting project; outages are only logged when unset
    #[arg(long, env = "DEVMON_PROJECT", global = true)]
    pub project: Option<String>,

    /// Seconds a device may stay offline before it is reported
    #[arg(long, global = true, value_name = "SECS")]
    pub device_timeout: Option<u64>,

    /// Registry polling interval in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// File containing the registry access token
    #[arg(long = "access-token", global = true, value_name = "PATH")]
    pub access_token: Option<PathBuf>,

    /// File of device ids to monitor, one per line (default: all devices)
    #[arg(long, global = true, value_name = "PATH")]
    pub device_list: Option<PathBuf>,

    /// Registry device listing URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(
        long,
        env = "DEVMON_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitor and the status server (default)
    Run,

    /// Fetch the registry once and print monitored devices
    Check(CheckArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the merged configuration as TOML (secrets redacted)
    Show,
    /// Print the default config file location
    Path,
}
