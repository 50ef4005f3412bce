use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use log::{debug, info};
use reqwest::Url;
use serde::Deserialize;

use super::types::IdentityConfig;
use crate::error_handling::types::ConfigError;
use crate::routing::DEFAULT_SIGN_IN_PATH;
use crate::storage::file_token_store::DEFAULT_SLOT;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_DATA_DIR: &str = ".marathon-session";
const USER_FILE_NAME: &str = "identity.json";

/// Application configuration structure that defines all runtime parameters.
///
/// Loaded from a TOML file with every field optional; missing fields take the
/// defaults below. Command-line flags and environment variables are layered on
/// top with [`Config::apply_overrides`].
///
/// # Example file
///
/// ```toml
/// api_base_url = "https://api.marathonhub.example/api"
/// data_dir = "/var/lib/marathon-session"
/// request_timeout_secs = 15
///
/// [identity]
/// api_key = "AIza..."
/// ```
///
/// # Fields Overview
///
/// - `api_base_url`: base of the application backend; the session exchange is `{api_base_url}/auth/login`
/// - `data_dir`: directory holding the token slot and the persisted identity-provider user
/// - `token_slot`: file name of the session token slot inside `data_dir`
/// - `request_timeout_secs`: timeout applied to every outgoing HTTP request
/// - `sign_in_path`: where the route guard sends unauthenticated navigations
/// - `identity`: identity provider settings, see [`IdentityConfig`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub token_slot: String,
    pub request_timeout_secs: u64,
    pub sign_in_path: String,
    pub identity: IdentityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            token_slot: DEFAULT_SLOT.to_string(),
            request_timeout_secs: 10,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Overrides taken from the command line or the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Base URL of the application backend
    #[arg(long, env = "MARATHON_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Directory holding the session token and identity state
    #[arg(long, env = "MARATHON_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Identity provider API key
    #[arg(long, env = "MARATHON_IDENTITY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(url) = &overrides.api_base_url {
            debug!("api_base_url overridden to {}", url);
            self.api_base_url = url.clone();
        }
        if let Some(dir) = &overrides.data_dir {
            debug!("data_dir overridden to {}", dir.display());
            self.data_dir = dir.clone();
        }
        if let Some(key) = &overrides.api_key {
            self.identity.api_key = key.clone();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("identity.identity_endpoint", &self.identity.identity_endpoint),
            ("identity.securetoken_endpoint", &self.identity.securetoken_endpoint),
        ] {
            let parsed =
                Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", name, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(format!(
                    "{}: unsupported scheme {}",
                    name,
                    parsed.scheme()
                )));
            }
        }
        if self.identity.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(1..=300).contains(&self.request_timeout_secs) {
            return Err(ConfigError::NotInRange(format!(
                "request_timeout_secs must be within 1..=300, got {}",
                self.request_timeout_secs
            )));
        }
        if !self.sign_in_path.starts_with('/') {
            return Err(ConfigError::BadPath(format!(
                "sign_in_path must start with '/', got {}",
                self.sign_in_path
            )));
        }
        if self.token_slot.is_empty() || self.token_slot.contains(['/', '\\']) {
            return Err(ConfigError::BadPath(format!(
                "token_slot must be a plain file name, got {:?}",
                self.token_slot
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where the identity provider's signed-in user is mirrored, if enabled.
    pub fn user_file(&self) -> Option<PathBuf> {
        self.identity
            .persist_user
            .then(|| self.data_dir.join(USER_FILE_NAME))
    }
}
