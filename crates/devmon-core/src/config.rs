// ── Runtime configuration types ──
//
// These types describe what the monitor needs at runtime. They are
// constructed by the CLI/config layer and passed into `Monitor::new()`.
// No file I/O or env lookups happen here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devmon_api::{ErrorReportingClient, RegistryClient, ServiceContext, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Interval between registry polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Continuous offline duration that triggers a report.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on a single alert delivery.
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the queue between outage timers and the error sink.
pub const REPORT_QUEUE_CAPACITY: usize = 20;

/// Largest accepted poll interval, device timeout, or alert timeout.
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ── Allow-list ───────────────────────────────────────────────────────

/// Set of device ids to monitor. Empty means every device is monitored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: HashSet<String>,
}

impl AllowList {
    /// Monitor every device.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse newline-delimited ids. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        Self::from_ids(
            text.lines()
                .map(|line| line.split('#').next().unwrap_or_default().trim())
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn monitors(&self, device_id: &str) -> bool {
        self.ids.is_empty() || self.ids.contains(device_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ── Monitor configuration ────────────────────────────────────────────

/// Timing and filtering parameters for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub device_timeout: Duration,
    pub alert_timeout: Duration,
    pub allow_list: AllowList,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            device_timeout: DEFAULT_DEVICE_TIMEOUT,
            alert_timeout: DEFAULT_ALERT_TIMEOUT,
            allow_list: AllowList::all(),
        }
    }
}

impl MonitorConfig {
    /// Reject timing combinations the reconciler cannot honor.
    ///
    /// The device timeout must be at least one poll interval, otherwise an
    /// outage could be reported before a recovery is observable.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.device_timeout < self.poll_interval {
            return Err(CoreError::Config {
                message: format!(
                    "device timeout ({}) must not be shorter than the poll interval ({})",
                    humantime::format_duration(self.device_timeout),
                    humantime::format_duration(self.poll_interval),
                ),
            });
        }
        if self.alert_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "alert timeout must be greater than zero".into(),
            });
        }
        for (name, value) in [
            ("poll interval", self.poll_interval),
            ("device timeout", self.device_timeout),
            ("alert timeout", self.alert_timeout),
        ] {
            if value > MAX_DURATION {
                return Err(CoreError::Config {
                    message: format!(
                        "{name} ({}) exceeds the maximum of {}",
                        humantime::format_duration(value),
                        humantime::format_duration(MAX_DURATION),
                    ),
                });
            }
        }
        Ok(())
    }
}

// ── Registry connection ──────────────────────────────────────────────

/// Connection settings for the device registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub url: Url,
    pub access_token: SecretString,
    pub ca_cert: Option<PathBuf>,
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn build_client(&self) -> Result<RegistryClient, CoreError> {
        let transport = transport(self.ca_cert.as_deref(), self.timeout);
        Ok(RegistryClient::from_access_token(
            self.url.as_str(),
            &self.access_token,
            &transport,
        )?)
    }
}

// ── Error reporting connection ───────────────────────────────────────

/// Destination for outage reports.
#[derive(Debug, Clone)]
pub struct ReportingConfig {
    pub endpoint: Url,
    pub project: String,
    pub api_key: Option<SecretString>,
    pub service: String,
    pub version: String,
    pub timeout: Duration,
}

impl ReportingConfig {
    pub fn build_client(&self) -> Result<ErrorReportingClient, CoreError> {
        let transport = transport(None, self.timeout);
        let context = ServiceContext {
            service: self.service.clone(),
            version: self.version.clone(),
        };
        Ok(ErrorReportingClient::new(
            self.endpoint.as_str(),
            &self.project,
            self.api_key.clone(),
            context,
            &transport,
        )?)
    }
}

fn transport(ca_cert: Option<&Path>, timeout: Duration) -> TransportConfig {
    TransportConfig {
        tls: ca_cert.map_or(TlsMode::System, |p| TlsMode::CustomCa(p.to_path_buf())),
        timeout,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::{AllowList, MAX_DURATION, MonitorConfig};
    use crate::error::CoreError;

    #[test]
    fn empty_allow_list_monitors_everything() {
        let list = AllowList::all();
        assert!(list.monitors("anything"));
        assert!(list.is_empty());
    }

    #[test]
    fn allow_list_skips_blanks_and_comments() {
        let list = AllowList::parse("# fleet\nd1\n\n  d2  \nd3 # spare\n   \n");
        assert_eq!(list.len(), 3);
        assert!(list.monitors("d1"));
        assert!(list.monitors("d2"));
        assert!(list.monitors("d3"));
        assert!(!list.monitors("d4"));
    }

    #[test]
    fn comment_only_file_monitors_everything() {
        let list = AllowList::parse("# nothing yet\n\n");
        assert!(list.is_empty());
        assert!(list.monitors("d9"));
    }

    #[test]
    fn defaults_are_valid() {
        MonitorConfig::default().validate().unwrap();
    }

    #[test]
    fn timeout_shorter_than_poll_is_rejected() {
        let config = MonitorConfig {
            poll_interval: Duration::from_secs(30),
            device_timeout: Duration::from_secs(10),
            ..MonitorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(err.to_string().contains("poll interval"));
    }

    #[test]
    fn timeout_equal_to_poll_is_accepted() {
        let config = MonitorConfig {
            poll_interval: Duration::from_secs(30),
            device_timeout: Duration::from_secs(30),
            ..MonitorConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = MonitorConfig {
            poll_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn durations_past_the_ceiling_are_rejected() {
        let config = MonitorConfig {
            device_timeout: Duration::from_secs(u64::MAX),
            ..MonitorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("device timeout"));

        let config = MonitorConfig {
            poll_interval: MAX_DURATION + Duration::from_secs(1),
            device_timeout: MAX_DURATION + Duration::from_secs(1),
            ..MonitorConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("poll interval"));

        let config = MonitorConfig {
            poll_interval: MAX_DURATION,
            device_timeout: MAX_DURATION,
            ..MonitorConfig::default()
        };
        config.validate().unwrap();
    }
}
