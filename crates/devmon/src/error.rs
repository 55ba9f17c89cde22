//! CLI error types with miette diagnostics.
//!
//! Maps config and core errors into user-facing errors with help text and
//! stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use devmon_config::ConfigError;
use devmon_core::CoreError;

/// Process exit codes. Clap exits with 2 on usage errors.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const AUTH: i32 = 4;
    pub const CONNECTION: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(devmon::validation),
        help("Check the config file and flags. Run: devmon config show")
    )]
    Validation { field: String, reason: String },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(devmon::no_config),
        help("Pass an existing file to --config, or omit it to use {default}")
    )]
    NoConfig { path: String, default: String },

    #[error("Could not read {path}")]
    #[diagnostic(code(devmon::unreadable_file))]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(devmon::config))]
    Config(Box<figment::Error>),

    #[error("Could not bind the status server to {addr}")]
    #[diagnostic(
        code(devmon::bind_failed),
        help("Choose a free address with --host, e.g. --host 127.0.0.1:9090")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("No registry access token configured")]
    #[diagnostic(
        code(devmon::no_credentials),
        help(
            "Pass a token file with --access-token <PATH>, name an env var in\n\
             access_token_env, or store the token in the system keyring\n\
             (service 'devmon', entry 'access-token')."
        )
    )]
    NoCredentials,

    #[error("Registry rejected the access token: {message}")]
    #[diagnostic(
        code(devmon::auth_failed),
        help("Check that the token is valid and has not expired.")
    )]
    AuthFailed { message: String },

    // ── Registry ─────────────────────────────────────────────────────
    #[error("Could not reach the device registry: {message}")]
    #[diagnostic(
        code(devmon::connection_failed),
        help("Check network access and the registry URL (--registry-url).")
    )]
    ConnectionFailed { message: String },

    #[error("Registry returned an unexpected payload: {message}")]
    #[diagnostic(code(devmon::decode))]
    Decode { message: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Monitor error: {message}")]
    #[diagnostic(code(devmon::monitor))]
    Monitor { message: String },

    #[error("Status server failed")]
    #[diagnostic(code(devmon::server))]
    Server(#[source] std::io::Error),

    #[error("Could not listen for shutdown signals")]
    #[diagnostic(code(devmon::signal))]
    Signal(#[source] std::io::Error),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(devmon::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::NoConfig { .. }
            | Self::Unreadable { .. }
            | Self::Config(_)
            | Self::Bind { .. } => exit_code::CONFIG,
            Self::NoCredentials | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } | Self::Decode { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials => CliError::NoCredentials,
            ConfigError::NotFound { path } => CliError::NoConfig {
                path: path.display().to_string(),
                default: devmon_config::config_path().display().to_string(),
            },
            ConfigError::Read { path, source } => CliError::Unreadable {
                path: path.display().to_string(),
                source,
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message, .. } => CliError::ConnectionFailed { message },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Decode { message } => CliError::Decode { message },
            CoreError::Config { message } => CliError::Validation {
                field: "monitor".into(),
                reason: message,
            },
            other @ (CoreError::AlertDelivery { .. } | CoreError::AlreadyStarted) => {
                CliError::Monitor {
                    message: other.to_string(),
                }
            }
        }
    }
}
