//! Mock push-channel backend for integration tests.
//!
//! A WebSocket server that can:
//! - Accept connections and count them
//! - Broadcast raw frames to every connected client
//! - Abruptly drop all clients (to exercise reconnection)

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A mock push backend for testing.
pub struct MockPushServer {
    addr: SocketAddr,
    frame_tx: broadcast::Sender<String>,
    kick_tx: broadcast::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
    connections: Arc<Mutex<u32>>,
}

impl MockPushServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frame_tx, _) = broadcast::channel::<String>(64);
        let (kick_tx, _) = broadcast::channel::<()>(4);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));

        let frames = frame_tx.clone();
        let kicks = kick_tx.clone();
        let conns = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            frames.subscribe(),
                            kicks.subscribe(),
                            conns.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            frame_tx,
            kick_tx,
            shutdown_tx,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Broadcast one raw frame to every connected client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.frame_tx.send(frame.into());
    }

    /// Abruptly drop every connected client.
    pub fn kick_clients(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Number of connections accepted so far.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut frames: broadcast::Receiver<String>,
    mut kicks: broadcast::Receiver<()>,
    connections: Arc<Mutex<u32>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };

    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Ok(text) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = kicks.recv() => {
                // Drop the socket without a close handshake.
                break;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}
