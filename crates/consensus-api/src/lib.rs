//! REST client for the Consensus trading backend.
//!
//! Covers every pull endpoint and operator command of the backend API.
//! Every failure (transport, non-2xx status, malformed body) is a
//! recoverable `ApiError` for that one call; callers keep their previous
//! state and retry on their own cadence.

pub mod client;
pub mod error;

pub use client::{BackendClient, CommandAck, DemoToggleAck};
pub use error::{ApiError, ApiResult};
