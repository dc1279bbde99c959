//! The OAuth client JSON downloaded from Google Cloud Console.

use std::path::Path;

use calupsert_core::error::{CalError, CalResult};
use serde::Deserialize;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Desktop clients download with an `installed` section, web clients with `web`.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> CalResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CalError::Config(format!(
                "Could not read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&contents).map_err(|e| match e {
            CalError::Config(msg) => CalError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json(contents: &str) -> CalResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(contents)
            .map_err(|e| CalError::Config(format!("Invalid client secrets JSON: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            CalError::Config(
                "Client secrets have neither an \"installed\" nor a \"web\" section".into(),
            )
        })
    }
}
