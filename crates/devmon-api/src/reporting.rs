// Error reporting API client
//
// Sends one reported error event per call to
// `POST {endpoint}/v1beta1/projects/{project}/events:report`.
// Auth: optional `key` query parameter.

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Public endpoint of the hosted error reporting service.
pub const DEFAULT_REPORTING_ENDPOINT: &str = "https://clouderrorreporting.googleapis.com";

/// Identifies the reporting service and its version on every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceContext {
    pub service: String,
    pub version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportedErrorEvent<'a> {
    event_time: String,
    service_context: &'a ServiceContext,
    message: &'a str,
}

/// Client for the error reporting `events:report` endpoint.
pub struct ErrorReportingClient {
    http: reqwest::Client,
    report_url: Url,
    api_key: Option<SecretString>,
    service_context: ServiceContext,
}

impl ErrorReportingClient {
    /// Build a client that reports into `project`.
    pub fn new(
        endpoint: &str,
        project: &str,
        api_key: Option<SecretString>,
        service_context: ServiceContext,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(endpoint, project, api_key, service_context, http)
    }

    /// Build with a pre-built `reqwest::Client`.
    pub fn with_client(
        endpoint: &str,
        project: &str,
        api_key: Option<SecretString>,
        service_context: ServiceContext,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        let base = endpoint.trim_end_matches('/');
        let report_url = Url::parse(&format!(
            "{base}/v1beta1/projects/{project}/events:report"
        ))?;

        Ok(Self {
            http,
            report_url,
            api_key,
            service_context,
        })
    }

    /// The service context attached to every event.
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Report a single error event.
    ///
    /// The response body is ignored; only the status decides success.
    pub async fn report(&self, message: &str, event_time: DateTime<Utc>) -> Result<(), Error> {
        debug!("POST {}", self.report_url);

        let body = ReportedErrorEvent {
            event_time: event_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            service_context: &self.service_context,
            message,
        };

        let mut request = self.http.post(self.report_url.clone()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key.expose_secret())]);
        }

        let resp = request.send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(());
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("error reporting rejected credentials (HTTP {status})"),
            });
        }

        let raw = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw.chars().take(200).collect()
            },
        })
    }
}
