//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] consensus_core::CoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] consensus_channel::ChannelError),

    #[error("API error: {0}")]
    Api(#[from] consensus_api::ApiError),

    #[error("Sync error: {0}")]
    Sync(#[from] consensus_sync::SyncError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] consensus_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
