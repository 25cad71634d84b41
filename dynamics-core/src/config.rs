//! Tap configuration.
//!
//! Loaded from JSON, or YAML when the file extension is `.yaml`/`.yml`.
//! [`Config::load`] validates before returning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{parse_datetime, Watermark};

pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/token";
pub const DEFAULT_API_VERSION: &str = "9.2";
pub const DEFAULT_PAGE_SIZE: u32 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_USER_AGENT: &str = "tap-dynamics";

/// Connection and replication settings for one tap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Organisation root, e.g. `https://contoso.crm.dynamics.com`.
    #[serde(default)]
    pub url: String,
    /// Default watermark for streams with no bookmark.
    #[serde(default)]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// How requests are authorised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Use this bearer token as-is.
    Bearer(String),
    /// Exchange a refresh token at `token_url` for an access token.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: String,
    },
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}
fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Config = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                path: path.to_path_buf(),
                source: e,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check required keys, the start date and the credential set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingKey("url"));
        }
        if self.start_date.trim().is_empty() {
            return Err(ConfigError::MissingKey("start_date"));
        }
        if parse_datetime(&self.start_date).is_none() {
            return Err(ConfigError::InvalidStartDate(self.start_date.clone()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "page_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.auth().map(|_| ())
    }

    /// Resolve the credential set. An access token wins over refresh-token credentials.
    pub fn auth(&self) -> Result<Auth, ConfigError> {
        if let Some(token) = non_blank(&self.access_token) {
            return Ok(Auth::Bearer(token.to_string()));
        }
        match (
            non_blank(&self.client_id),
            non_blank(&self.client_secret),
            non_blank(&self.refresh_token),
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok(Auth::RefreshToken {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
                refresh_token: refresh.to_string(),
                token_url: self.token_url.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn start_watermark(&self) -> Watermark {
        Watermark::from(self.start_date.as_str())
    }

    /// `<url>/api/data/v<api_version>/`
    pub fn api_base(&self) -> String {
        format!(
            "{}/api/data/v{}/",
            self.url.trim_end_matches('/'),
            self.api_version
        )
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
