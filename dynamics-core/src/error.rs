//! Error types for dynamics-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the tap configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required key is absent or blank.
    #[error("config key `{0}` is required")]
    MissingKey(&'static str),

    /// A key is present but its value is unusable.
    #[error("config key `{key}` is invalid: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// `start_date` is not a recognisable timestamp.
    #[error("config key `start_date` is not a valid timestamp: {0}")]
    InvalidStartDate(String),

    /// Neither an access token nor a full refresh-token credential set was given.
    #[error(
        "no credentials: set `access_token`, or `client_id`, `client_secret` and `refresh_token`"
    )]
    MissingCredentials,
}

/// Errors raised while reading or writing replication state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but is not valid state JSON.
    #[error("failed to parse state at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error on the write path.
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
