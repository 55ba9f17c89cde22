//! `devmon run`: the long-running monitor plus the status server.

use devmon_config::Config;
use devmon_core::{LogSink, Monitor};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::CliError;
use crate::{server, signal};

pub async fn handle(config: &Config) -> Result<(), CliError> {
    // Everything that can be misconfigured is checked before any work starts.
    let monitor_config = devmon_config::monitor_config(config)?;
    let registry = devmon_config::registry_config(config)?;
    let reporting = devmon_config::reporting_config(config, env!("CARGO_PKG_VERSION"))?;
    let addr = config.listen_addr()?;

    let source = registry.build_client()?;
    let monitor = Monitor::new(monitor_config)?;
    info!(registry = %source.devices_url(), "polling device registry");

    let mut signals = signal::ShutdownSignals::install().map_err(CliError::Signal)?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local = listener.local_addr().map_err(CliError::Server)?;
    info!(addr = %local, "status server listening");

    match reporting {
        Some(ref reporting) => {
            let client = reporting.build_client()?;
            info!(project = %reporting.project, "reporting outages to error reporting");
            monitor.start(source, client).await?;
        }
        None => {
            warn!("no error reporting project configured, outages will only be logged");
            monitor.start(source, LogSink).await?;
        }
    }

    let server_failed = CancellationToken::new();
    let server = tokio::spawn({
        let failed = server_failed.clone();
        let shutdown = monitor.shutdown_token();
        async move {
            let result = server::serve(listener, shutdown).await;
            if result.is_err() {
                failed.cancel();
            }
            result
        }
    });

    tokio::select! {
        () = signals.recv() => {}
        () = server_failed.cancelled() => error!("status server stopped unexpectedly"),
    }

    info!(tasks = monitor.outstanding_tasks(), "draining outstanding work");
    monitor.shutdown().await;

    let served = server
        .await
        .map_err(|e| CliError::Server(std::io::Error::other(e)))?;
    served.map_err(CliError::Server)
}
