//! Error types for consensus-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid candle data: {0}")]
    InvalidCandle(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
