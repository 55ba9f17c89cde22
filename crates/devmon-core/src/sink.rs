// ── Error sink adapter ──
//
// Forwards outage reports from the report queue to an `AlertSink`, one at
// a time, each bounded by the alert timeout. Failures are logged and the
// report is dropped. On shutdown the queue is closed and whatever is
// already buffered is still delivered.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::AlertSink;
use crate::error::CoreError;
use crate::model::ErrorReport;

/// Drive `sink` until shutdown, then drain the buffered reports.
pub(crate) async fn error_sink_task<A: AlertSink>(
    sink: A,
    mut reports: mpsc::Receiver<ErrorReport>,
    shutdown: CancellationToken,
    alert_timeout: Duration,
) {
    loop {
        tokio::select! {
            biased;

            received = reports.recv() => {
                let Some(report) = received else { break };
                deliver(&sink, &report, alert_timeout).await;
            }
            () = shutdown.cancelled() => {
                reports.close();
                let mut drained = 0_usize;
                while let Some(report) = reports.recv().await {
                    deliver(&sink, &report, alert_timeout).await;
                    drained += 1;
                }
                debug!(drained, "error sink drained");
                break;
            }
        }
    }
    debug!("error sink stopped");
}

async fn deliver<A: AlertSink>(sink: &A, report: &ErrorReport, alert_timeout: Duration) {
    match forward(sink, report, alert_timeout).await {
        Ok(()) => info!(
            device_id = %report.device_id,
            device_name = %report.device_name,
            "outage reported"
        ),
        Err(e) => warn!(
            device_id = %report.device_id,
            error = %e,
            "dropping outage report"
        ),
    }
}

/// Send one report, giving up after `alert_timeout`.
pub(crate) async fn forward<A: AlertSink>(
    sink: &A,
    report: &ErrorReport,
    alert_timeout: Duration,
) -> Result<(), CoreError> {
    match tokio::time::timeout(alert_timeout, sink.report(report)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(CoreError::AlertDelivery { device_id, message })) => {
            Err(CoreError::AlertDelivery { device_id, message })
        }
        Ok(Err(other)) => Err(CoreError::AlertDelivery {
            device_id: report.device_id.clone(),
            message: other.to_string(),
        }),
        Err(_elapsed) => Err(CoreError::AlertDelivery {
            device_id: report.device_id.clone(),
            message: format!(
                "no response within {}",
                humantime::format_duration(alert_timeout)
            ),
        }),
    }
}
