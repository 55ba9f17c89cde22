// Async HTTP client for the device registry.
//
// Auth: `Authorization: Bearer <access token>` default header.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::types::DeviceRecord;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Device listing endpoint of the hosted registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://api.particle.io/v1/devices";

// ── Error response shape from the registry ───────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Client for the registry's device listing endpoint.
///
/// Every call is a single GET; retries are left to the caller's poll
/// cadence.
pub struct RegistryClient {
    http: reqwest::Client,
    devices_url: Url,
}

impl RegistryClient {
    /// Build from an access token and transport config.
    ///
    /// Injects `Authorization: Bearer …` as a sensitive default header.
    pub fn from_access_token(
        devices_url: &str,
        access_token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", access_token.expose_secret())).map_err(
                |e| Error::Authentication {
                    message: format!("invalid access token header value: {e}"),
                },
            )?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = transport.build_client_with_headers(headers)?;
        let devices_url = Url::parse(devices_url)?;

        Ok(Self { http, devices_url })
    }

    /// The device listing URL this client reads.
    pub fn devices_url(&self) -> &Url {
        &self.devices_url
    }

    /// Fetch every device visible to the access token, in registry order.
    ///
    /// `GET {devices_url}`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        debug!("GET {}", self.devices_url);

        let resp = self.http.get(self.devices_url.clone()).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let head = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {head:?})"),
                body,
            }
        })
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::InvalidAccessToken;
    }

    let raw = resp.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(ErrorResponse {
            error_description: Some(description),
            ..
        }) => description,
        Ok(ErrorResponse {
            error: Some(error), ..
        }) => error,
        _ if raw.is_empty() => status.to_string(),
        _ => preview(&raw).to_owned(),
    };

    Error::Api {
        status: status.as_u16(),
        message,
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
