//! Error types for consensus-telemetry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    Init(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
