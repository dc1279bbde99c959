//! Microsoft identity platform (v2.0) endpoints for a tenant.

use calupsert_core::error::{CalError, CalResult};
use url::Url;

pub const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Delegated permissions requested for the signed-in user.
pub const SCOPES: &[&str] = &[
    "https://graph.microsoft.com/Calendars.ReadWrite",
    "https://graph.microsoft.com/User.Read",
    "offline_access",
];

pub fn scope_string() -> String {
    SCOPES.join(" ")
}

#[derive(Debug, Clone)]
pub struct Authority {
    base: Url,
}

impl Authority {
    /// `tenant` is a GUID, a domain, or one of `common`/`organizations`/`consumers`.
    pub fn new(tenant: &str) -> CalResult<Self> {
        Self::with_login_base(LOGIN_BASE_URL, tenant)
    }

    pub fn with_login_base(login_base: &str, tenant: &str) -> CalResult<Self> {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(CalError::Validation("--tenant-id must not be empty".into()));
        }

        let mut base = Url::parse(login_base)
            .map_err(|e| CalError::Config(format!("Invalid login URL '{}': {}", login_base, e)))?;
        base.path_segments_mut()
            .map_err(|_| CalError::Config(format!("Unusable login URL {}", login_base)))?
            .pop_if_empty()
            .extend([tenant, "oauth2", "v2.0"]);

        Ok(Authority { base })
    }

    fn endpoint(&self, name: &str) -> String {
        let mut url = self.base.clone();
        // The base was checked to be hierarchical in the constructor.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(name);
        }
        url.into()
    }

    pub fn device_code_url(&self) -> String {
        self.endpoint("devicecode")
    }

    pub fn token_url(&self) -> String {
        self.endpoint("token")
    }

    pub fn authorize_url(&self) -> String {
        self.endpoint("authorize")
    }
}
