//! Configuration for the devmon binary.
//!
//! TOML file + `DEVMON_` environment loading via figment, access token
//! resolution (token file, env var, keyring), device allow-list files, and
//! translation into the runtime types of `devmon_core`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use devmon_core::{AllowList, MonitorConfig, RegistryConfig, ReportingConfig};

/// Keyring service name for stored credentials.
const KEYRING_SERVICE: &str = "devmon";
/// Keyring entry holding the registry access token.
const KEYRING_ACCESS_TOKEN: &str = "access-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no registry access token configured")]
    NoCredentials,

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
///
/// Durations are whole seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Status server bind address.
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Continuous offline time before a device is reported.
    #[serde(default = "default_device_timeout")]
    pub device_timeout: u64,

    /// Upper bound on a single error report delivery.
    #[serde(default = "default_alert_timeout")]
    pub alert_timeout: u64,

    /// Newline-delimited device ids to monitor. Unset means all devices.
    pub device_list: Option<PathBuf>,

    /// File holding the registry access token.
    pub access_token_path: Option<PathBuf>,

    /// Environment variable holding the registry access token.
    pub access_token_env: Option<String>,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub error_reporting: ReportingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            poll_interval: default_poll_interval(),
            device_timeout: default_device_timeout(),
            alert_timeout: default_alert_timeout(),
            device_list: None,
            access_token_path: None,
            access_token_env: None,
            registry: RegistrySettings::default(),
            error_reporting: ReportingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub timeout: u64,

    /// Path to a custom CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout: default_request_timeout(),
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportingSettings {
    /// Project to report into. Reports go to the log when unset.
    pub project: Option<String>,

    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_reporting_endpoint")]
    pub endpoint: String,

    /// API key (plaintext; prefer `api_key_env`).
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub timeout: u64,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            project: None,
            service: default_service(),
            endpoint: default_reporting_endpoint(),
            api_key: None,
            api_key_env: None,
            timeout: default_request_timeout(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_poll_interval() -> u64 {
    devmon_core::config::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_device_timeout() -> u64 {
    devmon_core::config::DEFAULT_DEVICE_TIMEOUT.as_secs()
}
fn default_alert_timeout() -> u64 {
    devmon_core::config::DEFAULT_ALERT_TIMEOUT.as_secs()
}
fn default_registry_url() -> String {
    devmon_api::DEFAULT_REGISTRY_URL.into()
}
fn default_reporting_endpoint() -> String {
    devmon_api::DEFAULT_REPORTING_ENDPOINT.into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_service() -> String {
    "devmon".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "devmon", "devmon").map_or_else(
        || PathBuf::from("/etc/devmon/config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from defaults, the TOML file, and `DEVMON_` env vars.
///
/// An explicit `path` must exist; the platform default may be absent.
/// Nested keys use a double underscore, e.g. `DEVMON_REGISTRY__URL`.
/// The unprefixed names in [`LEGACY_ENV`] are read too, below `DEVMON_*`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(legacy_env())
        .merge(Env::prefixed("DEVMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Unprefixed environment variables and the config keys they set.
pub const LEGACY_ENV: [(&str, &str); 6] = [
    ("ADDRESS", "listen"),
    ("GCP_PROJECT", "error_reporting.project"),
    ("DEVICE_TIMEOUT", "device_timeout"),
    ("POLL_INTERVAL", "poll_interval"),
    ("ACCESS_TOKEN_PATH", "access_token_path"),
    ("DEVICE_LIST_PATH", "device_list"),
];

fn legacy_env() -> Env {
    Env::raw()
        .only(&LEGACY_ENV.map(|(var, _)| var))
        .map(|var| {
            LEGACY_ENV
                .iter()
                .find(|(name, _)| var.as_str().eq_ignore_ascii_case(name))
                .map_or_else(|| var.as_str().into(), |(_, key)| (*key).into())
        })
}

impl Config {
    /// Render as TOML with secrets redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.error_reporting.api_key.is_some() {
            shown.error_reporting.api_key = Some("<redacted>".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }

    /// Parse `listen`; a bare `:port` binds every interface.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = match self.listen.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.listen.clone(),
        };
        listen.parse().map_err(|e| ConfigError::Validation {
            field: "listen".into(),
            reason: format!("'{}' is not a socket address: {e}", self.listen),
        })
    }
}

// ── Credential and file resolution ──────────────────────────────────

/// Read an access token file. Surrounding whitespace is stripped.
pub fn read_access_token(path: &Path) -> Result<SecretString, ConfigError> {
    let raw = read_file(path)?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::Validation {
            field: "access_token_path".into(),
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(SecretString::from(token.to_owned()))
}

/// Resolve the registry access token.
///
/// Order: token file, then the env var named by `access_token_env`, then
/// the system keyring. A configured but unreadable file is an error.
pub fn resolve_access_token(config: &Config) -> Result<SecretString, ConfigError> {
    // 1. Token file
    if let Some(ref path) = config.access_token_path {
        return read_access_token(path);
    }

    // 2. Named env var
    if let Some(ref env_name) = config.access_token_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.trim().is_empty() {
                return Ok(SecretString::from(val.trim().to_owned()));
            }
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCESS_TOKEN) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    Err(ConfigError::NoCredentials)
}

/// Read a device allow-list file.
pub fn read_device_list(path: &Path) -> Result<AllowList, ConfigError> {
    Ok(AllowList::parse(&read_file(path)?))
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// ── Translation to runtime config ───────────────────────────────────

/// Build the monitor's timing and filtering config.
pub fn monitor_config(config: &Config) -> Result<MonitorConfig, ConfigError> {
    if config.poll_interval == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    if config.device_timeout < config.poll_interval {
        return Err(ConfigError::Validation {
            field: "device_timeout".into(),
            reason: format!(
                "{}s is shorter than the poll interval ({}s)",
                config.device_timeout, config.poll_interval
            ),
        });
    }
    if config.alert_timeout == 0 {
        return Err(ConfigError::Validation {
            field: "alert_timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let max = devmon_core::config::MAX_DURATION.as_secs();
    for (field, value) in [
        ("poll_interval", config.poll_interval),
        ("device_timeout", config.device_timeout),
        ("alert_timeout", config.alert_timeout),
    ] {
        if value > max {
            return Err(ConfigError::Validation {
                field: field.into(),
                reason: format!("{value}s exceeds the maximum of {max}s"),
            });
        }
    }

    let allow_list = match config.device_list {
        Some(ref path) => read_device_list(path)?,
        None => AllowList::all(),
    };

    Ok(MonitorConfig {
        poll_interval: Duration::from_secs(config.poll_interval),
        device_timeout: Duration::from_secs(config.device_timeout),
        alert_timeout: Duration::from_secs(config.alert_timeout),
        allow_list,
    })
}

/// Build the registry connection config, resolving the access token.
pub fn registry_config(config: &Config) -> Result<RegistryConfig, ConfigError> {
    let url = parse_url("registry.url", &config.registry.url)?;
    let access_token = resolve_access_token(config)?;

    Ok(RegistryConfig {
        url,
        access_token,
        ca_cert: config.registry.ca_cert.clone(),
        timeout: Duration::from_secs(config.registry.timeout),
    })
}

/// Build the error reporting config, or `None` when no project is set.
pub fn reporting_config(
    config: &Config,
    version: &str,
) -> Result<Option<ReportingConfig>, ConfigError> {
    let settings = &config.error_reporting;
    let Some(project) = settings.project.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let endpoint = parse_url("error_reporting.endpoint", &settings.endpoint)?;

    let api_key = settings
        .api_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .or_else(|| settings.api_key.clone())
        .map(SecretString::from);

    Ok(Some(ReportingConfig {
        endpoint,
        project: project.to_owned(),
        api_key,
        service: settings.service.clone(),
        version: version.to_owned(),
        timeout: Duration::from_secs(settings.timeout),
    }))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}
