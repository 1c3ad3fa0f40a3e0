//! Live operator console for the Consensus trading agent.
//!
//! Composition root: wires the push channel, the REST pulls, the state
//! store, and the notification stack into one running application.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, OperatorCommand};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
