//! Error types for consensus-api.

use thiserror::Error;

/// Backend API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Result type alias for backend API calls.
pub type ApiResult<T> = Result<T, ApiError>;
