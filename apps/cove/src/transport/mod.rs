use anyhow::Result;
use async_trait::async_trait;

pub mod mock;
pub mod websocket;

/// Transport trait abstracting the socket carrying envelope text frames.
///
/// One connection per session; frames are delivered in arrival order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one text frame to the remote peer.
    async fn send(&self, text: String) -> Result<()>;

    /// Receive the next text frame. `None` means the transport closed.
    async fn recv(&mut self) -> Option<String>;

    /// Check if the transport is connected
    fn is_connected(&self) -> bool;
}
