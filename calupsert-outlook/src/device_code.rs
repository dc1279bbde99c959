//! OAuth 2.0 device authorization grant (RFC 8628).
//!
//! The user is told to open a verification URL and type a short code; we
//! poll the token endpoint until they finish, the code expires, or Ctrl-C.

use std::time::Duration;

use calupsert_core::error::{CalError, CalResult};
use calupsert_core::oauth::{DevicePoll, OAuthErrorBody, TokenEndpoint, TokenResponse};
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_STEP_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeviceAuthorization {
    /// What to show the user on stderr.
    pub fn instructions(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }

        let mut text = format!(
            "Open {} and enter code {}",
            self.verification_uri, self.user_code
        );
        if let Some(complete) = &self.verification_uri_complete {
            text.push_str(&format!("\n(Direct link) {}", complete));
        }
        text
    }
}

/// Ask the identity provider for a device code.
pub async fn start(
    http: &reqwest::Client,
    device_code_url: &str,
    client_id: &str,
    scope: &str,
) -> CalResult<DeviceAuthorization> {
    let response = http
        .post(device_code_url)
        .form(&[("client_id", client_id), ("scope", scope)])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => format!("{} {}", status, body.trim()),
        };
        return Err(CalError::Authentication(format!(
            "Device code request failed: {}",
            message
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| CalError::Authentication(format!("Unreadable device code response: {}", e)))
}

/// Poll until the user completes sign-in.
pub async fn wait_for_token(
    endpoint: &TokenEndpoint,
    device: &DeviceAuthorization,
    cancel: &CancellationToken,
) -> CalResult<TokenResponse> {
    let deadline = Instant::now() + Duration::from_secs(device.expires_in);
    let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_INTERVAL_SECS));

    loop {
        if Instant::now() >= deadline {
            return Err(CalError::Authentication(
                "Device code expired before sign-in completed".into(),
            ));
        }

        match endpoint.poll_device_code(&device.device_code).await? {
            DevicePoll::Granted(tokens) => return Ok(tokens),
            DevicePoll::Pending => {}
            DevicePoll::SlowDown => {
                interval += Duration::from_secs(SLOW_DOWN_STEP_SECS);
                tracing::debug!(?interval, "identity provider asked to slow down");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(CalError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
