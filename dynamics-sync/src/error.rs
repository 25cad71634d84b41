//! Error types for dynamics-sync.

use thiserror::Error;

use dynamics_client::ClientError;
use dynamics_core::StateError;

/// All errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote query, metadata or transport failure.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// State checkpoint could not be written.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The sink could not accept a message.
    #[error("failed to emit message: {0}")]
    Emit(#[source] std::io::Error),

    /// JSON serialization error on the emit path.
    #[error("message JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bookmark or start date that cannot be used as a filter bound.
    #[error("stream `{stream}`: watermark `{value}` is not a timestamp")]
    InvalidWatermark { stream: String, value: String },

    /// One or more fields of a record do not fit the stream schema.
    #[error("stream `{stream}`: record does not match schema: {}", errors.join("; "))]
    SchemaMismatch { stream: String, errors: Vec<String> },
}
