//! Installed-app OAuth flow for Google.
//!
//! The consent page is opened in the browser and redirects back to a
//! listener on `127.0.0.1:<ephemeral port>`. The code is then exchanged at
//! the token URI from the client secrets file.

use async_trait::async_trait;
use calupsert_core::error::{CalError, CalResult};
use calupsert_core::loopback::{self, LoopbackListener};
use calupsert_core::oauth::TokenEndpoint;
use calupsert_core::session::Authenticator;
use calupsert_core::token_cache::Credential;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client_secrets::ClientSecrets;

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

pub struct GoogleAuthenticator {
    secrets: ClientSecrets,
    token_endpoint: TokenEndpoint,
}

impl GoogleAuthenticator {
    pub fn new(http: reqwest::Client, secrets: ClientSecrets) -> Self {
        let token_endpoint = TokenEndpoint::new(
            http,
            secrets.token_uri.clone(),
            secrets.client_id.clone(),
            secrets.client_secret.clone(),
        );

        GoogleAuthenticator {
            secrets,
            token_endpoint,
        }
    }

    /// Consent URL asking for offline access so a refresh token is issued.
    pub fn consent_url(&self, redirect_uri: &str, state: &str) -> CalResult<Url> {
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| CalError::Config(format!("Invalid auth_uri '{}': {}", self.secrets.auth_uri, e)))
    }
}

#[async_trait]
impl Authenticator for GoogleAuthenticator {
    fn client_id(&self) -> &str {
        &self.secrets.client_id
    }

    async fn refresh(&self, refresh_token: &str) -> CalResult<Credential> {
        let tokens = self.token_endpoint.refresh(refresh_token, None).await?;
        Ok(tokens.into_credential(&self.secrets.client_id, SCOPES))
    }

    async fn authorize(&self, _cancel: &CancellationToken) -> CalResult<Credential> {
        let listener = LoopbackListener::bind_ephemeral().await?;
        let state = loopback::new_state();
        let url = self.consent_url(listener.redirect_uri(), &state)?;

        loopback::open_browser(url.as_str());

        let code = listener.wait_for_code(&state).await?;
        eprintln!("\nReceived authorization code, exchanging for tokens...");

        let tokens = self
            .token_endpoint
            .exchange_code(&code, listener.redirect_uri(), None)
            .await?;

        eprintln!("Authentication successful!");
        Ok(tokens.into_credential(&self.secrets.client_id, SCOPES))
    }
}
