// ── Alert sink seam ──
//
// Outage reports leave the process through an `AlertSink`. The error
// reporting client is the production sink; `LogSink` is used when no
// reporting project is configured.

use std::future::Future;

use devmon_api::ErrorReportingClient;
use tracing::error;

use crate::error::CoreError;
use crate::model::ErrorReport;

/// Destination for outage reports.
pub trait AlertSink: Send + Sync + 'static {
    fn report(&self, report: &ErrorReport) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl AlertSink for ErrorReportingClient {
    async fn report(&self, report: &ErrorReport) -> Result<(), CoreError> {
        ErrorReportingClient::report(self, &report.message(), chrono::Utc::now())
            .await
            .map_err(|e| CoreError::AlertDelivery {
                device_id: report.device_id.clone(),
                message: e.to_string(),
            })
    }
}

/// Writes each report to the log at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    async fn report(&self, report: &ErrorReport) -> Result<(), CoreError> {
        error!(
            device_id = %report.device_id,
            device_name = %report.device_name,
            offline_since = %report.offline_since,
            "{}",
            report.message()
        );
        Ok(())
    }
}
