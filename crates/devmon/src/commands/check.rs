//! `devmon check`: one registry fetch, printed.

use devmon_config::Config;
use devmon_core::{DeviceSource, Snapshot};

use crate::cli::CheckArgs;
use crate::error::CliError;

pub async fn handle(config: &Config, args: &CheckArgs) -> Result<(), CliError> {
    let monitor_config = devmon_config::monitor_config(config)?;
    let registry = devmon_config::registry_config(config)?;
    let client = registry.build_client()?;

    let snapshot = client.fetch().await?;
    let monitored: Snapshot = snapshot
        .iter()
        .filter(|device| monitor_config.allow_list.monitors(&device.id))
        .cloned()
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(monitored.devices())?);
        return Ok(());
    }

    for device in &monitored {
        let id = device.id.as_str();
        let state = if device.connected { "online" } else { "offline" };
        let name = if device.name.is_empty() {
            "-"
        } else {
            device.name.as_str()
        };
        println!("{id:<26} {state:<8} {name}");
    }
    println!(
        "\n{} monitored, {} offline",
        monitored.len(),
        monitored.offline_count()
    );
    Ok(())
}
