//! OAuth 2.0 token endpoint client.
//!
//! Google and the Microsoft identity platform both speak plain RFC 6749 /
//! RFC 8628 on their token endpoints, so code exchange, refresh and
//! device-code polling share this implementation.

use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::error::{CalError, CalResult};
use crate::token_cache::Credential;

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn into_credential(self, client_id: &str, requested_scopes: &[&str]) -> Credential {
        let expires_at = self
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        let scopes = match self.scope {
            Some(granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => requested_scopes.iter().map(|s| s.to_string()).collect(),
        };

        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            client_id: client_id.to_string(),
            scopes,
        }
    }
}

/// RFC 6749 section 5.2 error body.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    fn into_error(self) -> CalError {
        match self.error_description {
            Some(desc) => CalError::Authentication(format!("{}: {}", self.error, desc)),
            None => CalError::Authentication(self.error),
        }
    }
}

/// One round of device-code polling.
#[derive(Debug)]
pub enum DevicePoll {
    Granted(TokenResponse),
    Pending,
    SlowDown,
}

#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl TokenEndpoint {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        TokenEndpoint {
            http,
            url: url.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        scope: Option<&str>,
    ) -> CalResult<TokenResponse> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        self.request(form).await?.map_err(OAuthErrorBody::into_error)
    }

    pub async fn refresh(&self, refresh_token: &str, scope: Option<&str>) -> CalResult<TokenResponse> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        self.request(form).await?.map_err(OAuthErrorBody::into_error)
    }

    pub async fn poll_device_code(&self, device_code: &str) -> CalResult<DevicePoll> {
        let form = vec![("grant_type", DEVICE_CODE_GRANT), ("device_code", device_code)];

        match self.request(form).await? {
            Ok(tokens) => Ok(DevicePoll::Granted(tokens)),
            Err(body) => match body.error.as_str() {
                "authorization_pending" => Ok(DevicePoll::Pending),
                "slow_down" => Ok(DevicePoll::SlowDown),
                _ => Err(body.into_error()),
            },
        }
    }

    async fn request<'a>(
        &'a self,
        mut form: Vec<(&'a str, &'a str)>,
    ) -> CalResult<Result<TokenResponse, OAuthErrorBody>> {
        form.push(("client_id", self.client_id.as_str()));
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self.http.post(&self.url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                CalError::Authentication(format!("Unreadable token response: {}", e))
            })?;
            return Ok(Ok(tokens));
        }

        match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(err) => Ok(Err(err)),
            Err(_) => Err(CalError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status,
                body.trim()
            ))),
        }
    }
}
