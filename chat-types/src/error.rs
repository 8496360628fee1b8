//! Error types for chatsync wire handling.

use thiserror::Error;

/// Errors that can occur while decoding a backend response.
#[derive(Debug, Error)]
pub enum WireError {
    /// The backend answered `status: false`.
    #[error("request rejected: {message}")]
    Rejected {
        /// Explanation supplied by the backend.
        message: String,
    },

    /// The backend answered `status: true` without a payload.
    #[error("response missing data")]
    MissingData,

    /// JSON decoding failed.
    #[error("invalid response body: {0}")]
    Json(#[source] serde_json::Error),
}
