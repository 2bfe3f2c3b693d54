//! Error types for the hydownloader connection crate.

use thiserror::Error;

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Errors raised while building or executing a call against the hydownloader API.
///
/// These never cross the dispatcher boundary directly: the dispatcher turns
/// them into a [`RequestFailure`](crate::RequestFailure) on the request's
/// `Failed` event.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured API URL plus endpoint is not a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header value (typically the access key) contains illegal characters
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The call produced no HTTP answer (connection reset, refused, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// No Tokio runtime was available to drive requests
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ConnectError {
    /// Create an invalid URL error
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl(message.into())
    }

    /// Create an invalid header error
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
