use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::Transport;

/// In-process transport endpoint for tests.
///
/// [`pair`] wires two endpoints back to back: frames sent on one side
/// arrive on the other, so a test can play the server.
pub struct MockTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    connected: Arc<Mutex<bool>>,
}

/// Create a connected pair of endpoints sharing one connected flag.
pub fn pair() -> (MockTransport, MockTransport) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    let connected = Arc::new(Mutex::new(true));
    (
        MockTransport {
            tx: tx_a,
            rx: rx_b,
            connected: connected.clone(),
        },
        MockTransport {
            tx: tx_b,
            rx: rx_a,
            connected,
        },
    )
}

impl MockTransport {
    /// Tear the link down from either side.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow::anyhow!("mock transport disconnected"));
        }
        self.tx
            .send(text)
            .map_err(|e| anyhow::anyhow!("send error: {e}"))?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        if !self.is_connected() {
            return None;
        }
        self.rx.recv().await
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }
}
