//! Push channel client for the Consensus operator console.
//!
//! Provides the persistent connection to the backend's debate stream:
//! - Automatic reconnection with exponential backoff
//! - A typed event stream (opened / closed / errored / frame)
//! - Frame parsing with drop-and-log handling of malformed input
//! - Graceful, cancellation-driven shutdown

pub mod connection;
pub mod error;
pub mod frame;

pub use connection::{ChannelConfig, ChannelEvent, ChannelState, ConnectionManager};
pub use error::{ChannelError, ChannelResult};
pub use frame::{parse_frame, PushFrame};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
