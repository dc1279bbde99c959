//! On-disk OAuth credential cache.
//!
//! The cache is a single JSON file whose location is decided at startup and
//! passed in explicitly. It is the only state this tool writes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalError, CalResult};

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A delegated OAuth credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// OAuth client that obtained the tokens.
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Credential {
    /// A credential without a known expiry is assumed valid; the provider
    /// answers 401 if it is not.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at,
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenCache { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached credential. A missing file is not an error.
    pub fn load(&self) -> CalResult<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            CalError::TokenCache(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let credential: Credential = serde_json::from_str(&contents).map_err(|e| {
            CalError::TokenCache(format!(
                "Failed to parse {}: {} (delete the file to sign in again)",
                self.path.display(),
                e
            ))
        })?;

        Ok(Some(credential))
    }

    /// Write the credential, replacing whatever was there.
    pub fn save(&self, credential: &Credential) -> CalResult<()> {
        let contents = serde_json::to_string_pretty(credential)
            .map_err(|e| CalError::TokenCache(format!("Failed to serialize credential: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalError::TokenCache(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        std::fs::write(&self.path, contents).map_err(|e| {
            CalError::TokenCache(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        // Owner-only, the file holds bearer and refresh tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| {
                    CalError::TokenCache(format!(
                        "Failed to set permissions on {}: {}",
                        self.path.display(),
                        e
                    ))
                },
            )?;
        }

        tracing::debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }
}
