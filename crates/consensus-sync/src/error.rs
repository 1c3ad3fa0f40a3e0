//! Error types for consensus-sync.

use thiserror::Error;

/// Errors surfaced by poll tasks. All of them are recoverable: the
/// previous state slice is retained and the task stays on its cadence.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("API error: {0}")]
    Api(#[from] consensus_api::ApiError),
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
