//! Local notifications for the Consensus operator console.
//!
//! Two layers:
//! - `NotificationGateway` wraps the platform's permission-gated
//!   notification capability behind an injected `NotifySink`, tracks
//!   shown notifications, supersedes by dedupe key, and auto-dismisses
//!   after a fixed display window.
//! - `NotificationPolicy` maps domain events (trade executed, debate
//!   decision, generic alert) onto gateway calls with per-category
//!   deduplication.
//!
//! Notification failures are swallowed by design; they must never affect
//! trading-state correctness.

pub mod gateway;
pub mod policy;

pub use gateway::{
    Notification, NotificationCategory, NotificationGateway, NotificationRecord, NotifySink,
    Permission, TracingSink,
};
pub use policy::{AlertSeverity, DebateDecision, NotificationPolicy};
