//! State synchronization core for the Consensus operator console.
//!
//! Reconciles the continuous push channel with the independently paced
//! pull channels into one consistent view model:
//! - `StateStore`: the single mutable view model, atomic per read
//! - `EventRouter`: classifies push frames and applies them in arrival
//!   order
//! - `PollingScheduler` + standard tasks: independent fetch-and-merge
//!   cycles with a staleness guard for symbol-scoped polls

pub mod error;
pub mod poller;
pub mod router;
pub mod store;
pub mod tasks;

pub use error::{SyncError, SyncResult};
pub use poller::{PollTask, PollingScheduler};
pub use router::EventRouter;
pub use store::{StateStore, StatusOrigin, TaggedStatus, ViewSnapshot};
pub use tasks::{refresh_status, spawn_candle_task, spawn_standard_tasks, PollPlan};
