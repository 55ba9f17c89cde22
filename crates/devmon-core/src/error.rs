// ── Core error types ──
//
// Errors surfaced by the monitor. Registry failures are classified into
// transport and decode failures; neither is fatal to the polling loop.
// The `From<devmon_api::Error>` impl performs that classification.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registry errors (recovered by skipping the tick) ─────────────
    #[error("Registry unreachable: {message}")]
    Transport {
        message: String,
        /// HTTP status code (if the registry answered at all).
        status: Option<u16>,
    },

    #[error("Registry rejected the access token: {message}")]
    AuthenticationFailed { message: String },

    #[error("Malformed registry payload: {message}")]
    Decode { message: String },

    // ── Alerting errors (report dropped) ─────────────────────────────
    #[error("Alert delivery failed for device {device_id}: {message}")]
    AlertDelivery { device_id: String, message: String },

    // ── Configuration errors (fatal at startup) ──────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Monitor has already been started")]
    AlreadyStarted,
}

impl CoreError {
    /// Returns `true` for failures that only cost the current poll.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::AlreadyStarted)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<devmon_api::Error> for CoreError {
    fn from(err: devmon_api::Error) -> Self {
        if err.is_decode() {
            return CoreError::Decode {
                message: err.to_string(),
            };
        }

        match err {
            devmon_api::Error::InvalidAccessToken => CoreError::AuthenticationFailed {
                message: "invalid access token".into(),
            },
            devmon_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            devmon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            devmon_api::Error::Tls(message) => CoreError::Config {
                message: format!("TLS setup failed: {message}"),
            },
            other => CoreError::Transport {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
