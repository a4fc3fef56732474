//! API error types.

use thiserror::Error;

/// Errors from Max Bot API calls.
///
/// Fetch-side errors are retried by the poll loop with a fixed delay;
/// send-side errors are surfaced to the caller and never retried here.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A caller-supplied argument is outside the API's accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bot token is empty.
    #[error("bot token is empty")]
    MissingToken,
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
