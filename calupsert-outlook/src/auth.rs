use async_trait::async_trait;
use calupsert_core::error::CalResult;
use calupsert_core::oauth::TokenEndpoint;
use calupsert_core::session::Authenticator;
use calupsert_core::token_cache::Credential;
use tokio_util::sync::CancellationToken;

use crate::identity::{Authority, SCOPES, scope_string};
use crate::{auth_code, device_code};

/// How the user signs in when no usable cached credential exists.
#[derive(Debug, Clone)]
pub enum SignInMethod {
    DeviceCode,
    /// Confidential client: browser consent redirected to `redirect_uri`.
    AuthorizationCode { redirect_uri: String },
}

pub struct GraphAuthenticator {
    http: reqwest::Client,
    authority: Authority,
    token_endpoint: TokenEndpoint,
    method: SignInMethod,
}

impl GraphAuthenticator {
    /// The authorization-code flow is used only when both a secret and a
    /// redirect URI are given; otherwise the device code flow.
    pub fn new(
        http: reqwest::Client,
        authority: Authority,
        client_id: &str,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        let method = match (&client_secret, redirect_uri) {
            (Some(_), Some(redirect_uri)) => SignInMethod::AuthorizationCode { redirect_uri },
            _ => SignInMethod::DeviceCode,
        };

        let token_endpoint =
            TokenEndpoint::new(http.clone(), authority.token_url(), client_id, client_secret);

        GraphAuthenticator {
            http,
            authority,
            token_endpoint,
            method,
        }
    }

    pub fn method(&self) -> &SignInMethod {
        &self.method
    }
}

#[async_trait]
impl Authenticator for GraphAuthenticator {
    fn client_id(&self) -> &str {
        self.token_endpoint.client_id()
    }

    async fn refresh(&self, refresh_token: &str) -> CalResult<Credential> {
        let scope = scope_string();
        let tokens = self.token_endpoint.refresh(refresh_token, Some(&scope)).await?;
        Ok(tokens.into_credential(self.client_id(), SCOPES))
    }

    async fn authorize(&self, cancel: &CancellationToken) -> CalResult<Credential> {
        let tokens = match &self.method {
            SignInMethod::DeviceCode => {
                let device = device_code::start(
                    &self.http,
                    &self.authority.device_code_url(),
                    self.client_id(),
                    &scope_string(),
                )
                .await?;

                eprintln!("\n== Device sign-in ==");
                eprintln!("{}", device.instructions());

                device_code::wait_for_token(&self.token_endpoint, &device, cancel).await?
            }
            SignInMethod::AuthorizationCode { redirect_uri } => {
                auth_code::sign_in(&self.authority, &self.token_endpoint, redirect_uri).await?
            }
        };

        eprintln!("Authentication successful!");
        Ok(tokens.into_credential(self.client_id(), SCOPES))
    }
}
