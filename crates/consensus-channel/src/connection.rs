//! Push channel connection manager.
//!
//! Owns the lifecycle of the single persistent WebSocket to the backend's
//! debate stream and republishes it as a typed event stream. Every loss
//! of the channel enters a visible `Reconnecting` state and retries with
//! exponential backoff; a console that goes permanently dark on one
//! dropped socket is useless as an operator surface.

use crate::error::{ChannelError, ChannelResult};
use crate::frame::{parse_frame, PushFrame};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL of the debate stream.
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
        }
    }
}

/// Channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Typed channel transition, replacing raw transport callbacks.
///
/// `Errored` is informational only; the connected flag flips on the
/// `Closed` that follows it.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Opened,
    Closed,
    Errored { detail: String },
    Frame(PushFrame),
}

/// Push channel connection manager.
pub struct ConnectionManager {
    config: ChannelConfig,
    state: Arc<RwLock<ChannelState>>,
    event_tx: mpsc::Sender<ChannelEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager publishing into `event_tx`.
    pub fn new(config: ChannelConfig, event_tx: mpsc::Sender<ChannelEvent>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ChannelState::Disconnected)),
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current channel state.
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// Number of reconnect attempts since the last successful connection.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown. The connect loop exits promptly, even
    /// mid-backoff, and sends a Close frame if currently connected.
    pub fn shutdown(&self) {
        info!("push channel shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run until shutdown or the reconnect budget is spent.
    pub async fn connect(&self) -> ChannelResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("shutdown requested, exiting connect loop");
                *self.state.write() = ChannelState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ChannelState::Connecting;

            match self.run_session().await {
                Ok(()) => {
                    info!("push channel closed");
                }
                Err(e) => {
                    error!(error = %e, "push channel session ended with error");
                }
            }

            if self.is_shutdown() {
                info!("shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ChannelState::Disconnected;
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "max reconnection attempts reached");
                *self.state.write() = ChannelState::Disconnected;
                return Err(ChannelError::ConnectionFailed(
                    "max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ChannelState::Reconnecting;

            let delay = self.backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), "reconnecting");

            // Cancellation-aware sleep so shutdown is not delayed by backoff.
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("shutdown requested during backoff, exiting");
                    *self.state.write() = ChannelState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    /// Establish one connection and pump it until it dies.
    ///
    /// Emits `Opened` once connected and `Closed` when the session ends,
    /// with an `Errored` in between when the cause was a failure.
    async fn run_session(&self) -> ChannelResult<()> {
        info!(url = %self.config.url, "connecting push channel");

        let (ws_stream, _response) =
            match connect_async_tls_with_config(&self.config.url, None, true, None).await {
                Ok(ok) => ok,
                Err(e) => {
                    self.emit(ChannelEvent::Errored {
                        detail: e.to_string(),
                    })
                    .await;
                    return Err(e.into());
                }
            };
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ChannelState::Connected;
        *self.reconnect_count.write() = 0;
        info!("push channel connected");
        self.emit(ChannelEvent::Opened).await;

        let result = self.read_loop(&mut write, &mut read).await;

        if let Err(e) = &result {
            self.emit(ChannelEvent::Errored {
                detail: e.to_string(),
            })
            .await;
        }
        self.emit(ChannelEvent::Closed).await;
        result
    }

    async fn read_loop(
        &self,
        write: &mut futures_util::stream::SplitSink<
            tokio_tungstenite::WebSocketStream<
                tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
            >,
            Message,
        >,
        read: &mut futures_util::stream::SplitStream<
            tokio_tungstenite::WebSocketStream<
                tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
            >,
        >,
    ) -> ChannelResult<()> {
        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("shutdown signal received in read loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "failed to send close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "normal close".to_string()));
                            warn!(code, %reason, "push channel closed by server");
                            return Err(ChannelError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "push channel read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("push channel stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Parse one text frame and forward it. Malformed frames are dropped
    /// with a diagnostic; they never tear down the channel.
    async fn handle_text(&self, text: &str) {
        match parse_frame(text) {
            Ok(frame) => {
                debug!(kind = frame.kind(), "frame received");
                self.emit(ChannelEvent::Frame(frame)).await;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
            }
        }
    }

    async fn emit(&self, event: ChannelEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("channel event receiver dropped");
        }
    }

    /// Exponential backoff: base * 2^(attempt-1), capped, plus jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent);
        let delay = delay.min(max);

        Duration::from_millis(delay + rand_jitter())
    }
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(config: ChannelConfig) -> ConnectionManager {
        let (event_tx, _event_rx) = mpsc::channel(16);
        ConnectionManager::new(config, event_tx)
    }

    #[test]
    fn test_default_config() {
        let config = ChannelConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0); // Infinite
        assert_eq!(config.reconnect_base_delay_ms, 1000);
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let mgr = manager(ChannelConfig {
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 8000,
            ..Default::default()
        });

        // Jitter adds at most 1000ms on top of the deterministic delay.
        let d1 = mgr.backoff_delay(1).as_millis() as u64;
        assert!((1000..2000).contains(&d1));

        let d3 = mgr.backoff_delay(3).as_millis() as u64;
        assert!((4000..5000).contains(&d3));

        let d10 = mgr.backoff_delay(10).as_millis() as u64;
        assert!((8000..9000).contains(&d10), "delay must cap at max");
    }

    #[test]
    fn test_initial_state_disconnected() {
        let mgr = manager(ChannelConfig::default());
        assert_eq!(mgr.state(), ChannelState::Disconnected);
        assert!(!mgr.is_shutdown());
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_max_attempts() {
        let mgr = manager(ChannelConfig {
            url: "ws://127.0.0.1:59999".to_string(), // Nothing listens here
            max_reconnect_attempts: 2,
            reconnect_base_delay_ms: 10,
            reconnect_max_delay_ms: 50,
            ..Default::default()
        });

        let result = tokio::time::timeout(Duration::from_secs(5), mgr.connect()).await;
        assert!(result.is_ok(), "connect loop must stop, not hang");
        assert!(result.unwrap().is_err(), "budget exhaustion is an error");
        assert_eq!(mgr.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_connect_loop() {
        let (event_tx, _event_rx) = mpsc::channel(16);
        let mgr = Arc::new(ConnectionManager::new(
            ChannelConfig {
                url: "ws://127.0.0.1:59999".to_string(),
                max_reconnect_attempts: 0, // Would retry forever
                reconnect_base_delay_ms: 5000,
                ..Default::default()
            },
            event_tx,
        ));

        let mgr_clone = mgr.clone();
        let handle = tokio::spawn(async move { mgr_clone.connect().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        mgr.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "shutdown must end the loop mid-backoff");
    }
}
