//! Authorization-code flow for confidential clients.
//!
//! Used instead of the device code when a client secret and a registered
//! redirect URI are configured. The listener binds the redirect URI's host
//! and port (8400 when the URI names none).

use calupsert_core::error::{CalError, CalResult};
use calupsert_core::loopback::{self, LoopbackListener};
use calupsert_core::oauth::{TokenEndpoint, TokenResponse};
use url::Url;

use crate::identity::{Authority, scope_string};

pub fn consent_url(
    authority: &Authority,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> CalResult<Url> {
    let scope = scope_string();
    Url::parse_with_params(
        &authority.authorize_url(),
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("response_mode", "query"),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| CalError::Config(format!("Invalid authorize URL: {}", e)))
}

pub async fn sign_in(
    authority: &Authority,
    endpoint: &TokenEndpoint,
    redirect_uri: &str,
) -> CalResult<TokenResponse> {
    let listener = LoopbackListener::bind_redirect_uri(redirect_uri).await?;
    let state = loopback::new_state();
    let url = consent_url(authority, endpoint.client_id(), listener.redirect_uri(), &state)?;

    loopback::open_browser(url.as_str());

    let code = listener.wait_for_code(&state).await?;
    eprintln!("\nReceived authorization code, exchanging for tokens...");

    let scope = scope_string();
    endpoint
        .exchange_code(&code, listener.redirect_uri(), Some(&scope))
        .await
}
