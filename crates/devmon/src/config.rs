//! CLI-aware configuration loading.
//!
//! Loads the file + environment config through `devmon_config` and layers
//! command-line flags on top.

use devmon_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the effective configuration for this invocation.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = devmon_config::load_config(global.config.as_deref())?;
    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut Config, global: &GlobalOpts) {
    if let Some(ref listen) = global.listen {
        config.listen.clone_from(listen);
    }
    if let Some(ref project) = global.project {
        config.error_reporting.project = Some(project.clone());
    }
    if let Some(secs) = global.device_timeout {
        config.device_timeout = secs;
    }
    if let Some(secs) = global.poll_interval {
        config.poll_interval = secs;
    }
    if let Some(ref path) = global.access_token {
        config.access_token_path = Some(path.clone());
    }
    if let Some(ref path) = global.device_list {
        config.device_list = Some(path.clone());
    }
    if let Some(ref url) = global.registry_url {
        config.registry.url.clone_from(url);
    }
}
