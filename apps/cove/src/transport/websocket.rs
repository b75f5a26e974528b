use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{RwLock as AsyncRwLock, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::Transport;

/// WebSocket implementation of the Transport trait
pub struct WebSocketTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    connected: Arc<AsyncRwLock<bool>>,
    ws_task: Option<tokio::task::JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Connect to the chat server and spawn the socket pump.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url).await?;

        // Channels for bidirectional communication with the pump task.
        let (tx_out, rx_out) = mpsc::unbounded_channel::<String>();
        let (tx_in, rx_in) = mpsc::unbounded_channel::<String>();

        let connected = Arc::new(AsyncRwLock::new(true));
        let connected_clone = connected.clone();

        let ws_task = tokio::spawn(async move {
            handle_websocket(ws_stream, rx_out, tx_in, connected_clone).await;
        });

        Ok(Self {
            tx: tx_out,
            rx: rx_in,
            connected,
            ws_task: Some(ws_task),
        })
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) {
        *self.connected.write().await = false;

        if let Some(task) = self.ws_task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow::anyhow!("WebSocket not connected"));
        }
        self.tx
            .send(text)
            .map_err(|e| anyhow::anyhow!("failed to queue frame: {e}"))?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    fn is_connected(&self) -> bool {
        // Use try_read to avoid blocking
        self.connected.try_read().map(|guard| *guard).unwrap_or(false)
    }
}

/// Handle WebSocket communication
async fn handle_websocket(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut rx_out: mpsc::UnboundedReceiver<String>,
    tx_in: mpsc::UnboundedSender<String>,
    connected: Arc<AsyncRwLock<bool>>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Forward outgoing frames to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(text) = rx_out.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Deliver incoming frames in arrival order.
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if tx_in.send(text).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {} // Ignore binary, ping and pong frames.
        }
    }

    // Mark as disconnected
    *connected.write().await = false;

    send_task.abort();
    let _ = send_task.await;
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.ws_task.take() {
            task.abort();
        }
    }
}
