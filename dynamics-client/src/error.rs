//! Error types for dynamics-client.

use thiserror::Error;

/// All errors that can arise talking to the Web API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Connection, TLS or timeout failure before a status was received.
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be decoded as the expected JSON.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The token endpoint did not return a usable access token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No entity set with this name exists in the organisation.
    #[error("entity set `{0}` not found")]
    EntityNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map a `ureq` failure onto [`ClientError`], reading the body of status errors.
pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => ClientError::Status {
            url: url.to_string(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ClientError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

pub(crate) fn decode_err(url: &str, source: std::io::Error) -> ClientError {
    ClientError::Decode {
        url: url.to_string(),
        source,
    }
}
