//! Credential establishment: cache, then silent refresh, then interactive sign-in.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{CalError, CalResult};
use crate::token_cache::{Credential, TokenCache};

/// Provider-specific OAuth flows.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Client the credentials are issued to. Cached credentials from a
    /// different client are ignored.
    fn client_id(&self) -> &str;

    /// Exchange a refresh token for a fresh credential.
    async fn refresh(&self, refresh_token: &str) -> CalResult<Credential>;

    /// Run the interactive flow (browser consent or device code).
    async fn authorize(&self, cancel: &CancellationToken) -> CalResult<Credential>;
}

pub struct SessionManager<A> {
    cache: TokenCache,
    authenticator: A,
    wait: Duration,
}

impl<A: Authenticator> SessionManager<A> {
    pub fn new(cache: TokenCache, authenticator: A, wait: Duration) -> Self {
        SessionManager {
            cache,
            authenticator,
            wait,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Obtain a usable credential, persisting anything newly issued.
    pub async fn establish(&self, cancel: &CancellationToken) -> CalResult<Credential> {
        let cached = self
            .cache
            .load()?
            .filter(|cred| self.issued_to_us(cred));

        if let Some(cached) = cached {
            if !cached.is_expired() {
                tracing::debug!(path = %self.cache.path().display(), "using cached credential");
                return Ok(cached);
            }

            if let Some(refresh_token) = cached.refresh_token.as_deref() {
                match self.authenticator.refresh(refresh_token).await {
                    Ok(mut fresh) => {
                        // Providers may omit the refresh token on refresh.
                        if fresh.refresh_token.is_none() {
                            fresh.refresh_token = Some(refresh_token.to_string());
                        }
                        tracing::info!("refreshed access token");
                        self.cache.save(&fresh)?;
                        return Ok(fresh);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "token refresh failed, signing in again");
                    }
                }
            }
        }

        let fresh = self.authorize_bounded(cancel).await?;
        self.cache.save(&fresh)?;
        Ok(fresh)
    }

    fn issued_to_us(&self, cred: &Credential) -> bool {
        // Legacy files carry no client id; accept them.
        if cred.client_id.is_empty() || cred.client_id == self.authenticator.client_id() {
            return true;
        }
        tracing::info!(
            cached = %cred.client_id,
            configured = %self.authenticator.client_id(),
            "cached credential belongs to another client, ignoring it"
        );
        false
    }

    async fn authorize_bounded(&self, cancel: &CancellationToken) -> CalResult<Credential> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CalError::Cancelled),
            outcome = tokio::time::timeout(self.wait, self.authenticator.authorize(cancel)) => {
                outcome.unwrap_or_else(|_| {
                    Err(CalError::Authentication(format!(
                        "Timed out after {}s waiting for sign-in",
                        self.wait.as_secs()
                    )))
                })
            }
        }
    }
}
