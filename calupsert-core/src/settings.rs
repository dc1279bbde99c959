//! Layered settings: optional TOML file, then `CALUPSERT_*` environment
//! variables. Command-line flags are applied on top by the binaries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, Source};
use serde::Deserialize;

use crate::error::{CalError, CalResult};

const APP_DIR: &str = "calupsert";
const ENV_PREFIX: &str = "CALUPSERT";

fn default_auth_timeout_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// IANA zone used when `--timezone` is not given.
    pub timezone: Option<String>,
    pub calendar_id: Option<String>,
    pub token_file: Option<PathBuf>,

    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // Google
    pub client_secrets: Option<PathBuf>,

    // Microsoft Graph
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            timezone: None,
            calendar_id: None,
            token_file: None,
            auth_timeout_secs: default_auth_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            client_secrets: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
        }
    }
}

impl Settings {
    /// Load settings for `provider` (`google`, `graph`).
    ///
    /// With `explicit_file` the file must exist; otherwise
    /// `<config_dir>/calupsert/<provider>.toml` is read if present.
    pub fn load(provider: &str, explicit_file: Option<&Path>) -> CalResult<Self> {
        let file = match explicit_file {
            Some(path) => File::from(expand_path(path)).required(true),
            None => File::from(config_dir()?.join(format!("{}.toml", provider))).required(false),
        };

        Self::from_sources(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_sources<S>(file: S, env: Environment) -> CalResult<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .map_err(|e| CalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalError::Config(e.to_string()))?;

        tracing::debug!(?settings.calendar_id, ?settings.timezone, "loaded settings");
        Ok(settings)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Token cache location: flag, then setting, then the per-provider default.
    pub fn token_path(&self, flag: Option<&Path>, default_file_name: &str) -> CalResult<PathBuf> {
        match flag.or(self.token_file.as_deref()) {
            Some(path) => Ok(expand_path(path)),
            None => Ok(config_dir()?.join(default_file_name)),
        }
    }
}

/// `<config_dir>/calupsert`, e.g. `~/.config/calupsert` on Linux.
pub fn config_dir() -> CalResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| CalError::Config("Could not determine config directory".into()))
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
