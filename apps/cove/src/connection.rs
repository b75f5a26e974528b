//! Connection lifecycle and the identify/register handshake.

use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::{self, Command};
use crate::transport::Transport;

/// Lifecycle of the single transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Identified,
    Failed,
}

impl ConnectionState {
    /// `open()` was requested on an idle machine.
    pub fn on_open_requested(self) -> Self {
        match self {
            ConnectionState::Disconnected => ConnectionState::Connecting,
            other => other,
        }
    }

    /// The transport reported an open socket.
    pub fn on_transport_open(self) -> Self {
        match self {
            ConnectionState::Connecting => ConnectionState::Connected,
            other => other,
        }
    }

    /// Both handshake envelopes were accepted by the transport. No
    /// acknowledgment is awaited before declaring the session identified.
    pub fn on_handshake_sent(self) -> Self {
        match self {
            ConnectionState::Connected => ConnectionState::Identified,
            other => other,
        }
    }

    /// The transport failed. During establishment this is fatal; after the
    /// session is up it means the socket went away.
    pub fn on_transport_error(self) -> Self {
        match self {
            ConnectionState::Identified => ConnectionState::Disconnected,
            _ => ConnectionState::Failed,
        }
    }

    /// The transport closed.
    pub fn on_close(self) -> Self {
        match self {
            ConnectionState::Connecting | ConnectionState::Connected => ConnectionState::Failed,
            ConnectionState::Failed => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    /// The server rejected the credential (`code == "4"`). Terminal from
    /// any state; the whole session must be restarted.
    pub fn on_auth_rejected(self) -> Self {
        ConnectionState::Failed
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Encode(#[from] protocol::EncodeError),
}

/// Owns the single transport connection and drives the handshake.
pub struct Connection<T: Transport> {
    transport: T,
    state: ConnectionState,
    server_url: String,
}

impl<T: Transport> Connection<T> {
    /// Wrap an opened transport and run the handshake: `identify {name}`
    /// followed by `register_name {passwd}`, in that order, before any chat
    /// traffic. The machine optimistically enters `Identified` once both
    /// sends are accepted at the transport layer.
    pub async fn establish(
        transport: T,
        server_url: impl Into<String>,
        name: &str,
        passwd: &str,
    ) -> Result<Self, ConnectionError> {
        let mut conn = Self {
            transport,
            state: ConnectionState::Disconnected,
            server_url: server_url.into(),
        };

        conn.state = conn.state.on_open_requested();
        if !conn.transport.is_connected() {
            conn.state = conn.state.on_transport_error();
            return Err(ConnectionError::Transport(
                "transport failed to open".into(),
            ));
        }
        conn.state = conn.state.on_transport_open();

        conn.send(&Command::Identify {
            name: name.to_string(),
        })
        .await?;
        conn.send(&Command::RegisterName {
            passwd: passwd.to_string(),
        })
        .await?;
        conn.state = conn.state.on_handshake_sent();
        info!(
            target: "cove::connection",
            server = %conn.server_url,
            "handshake sent, session identified"
        );
        Ok(conn)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Encode and transmit one outbound command. Fire and forget: there is
    /// no correlation id and no way to retract a sent command.
    pub async fn send(&mut self, command: &Command) -> Result<(), ConnectionError> {
        let text = protocol::encode(command)?;
        debug!(target: "cove::connection", frame = %text, "sending");
        match self.transport.send(text).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = self.state.on_transport_error();
                Err(ConnectionError::Transport(err.to_string()))
            }
        }
    }

    /// Next raw inbound frame; `None` once the transport closes, after
    /// which the state reflects the close.
    pub async fn recv(&mut self) -> Option<String> {
        let frame = self.transport.recv().await;
        if frame.is_none() {
            self.state = self.state.on_close();
        }
        frame
    }

    /// The server rejected the credential; terminal.
    pub fn fail_auth(&mut self) {
        self.state = self.state.on_auth_rejected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Transport as _, mock};
    use serde_json::Value;
    use tokio::time::{Duration, timeout};

    const ALL_STATES: [ConnectionState; 5] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Identified,
        ConnectionState::Failed,
    ];

    #[test]
    fn auth_rejection_fails_from_every_state() {
        for state in ALL_STATES {
            assert_eq!(state.on_auth_rejected(), ConnectionState::Failed);
        }
    }

    #[test]
    fn close_after_identify_is_a_plain_disconnect() {
        // Distinguishable from a credential rejection, which is Failed.
        assert_eq!(
            ConnectionState::Identified.on_close(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::Connecting.on_close(),
            ConnectionState::Failed
        );
    }

    #[test]
    fn open_walks_through_connecting_to_identified() {
        let state = ConnectionState::Disconnected
            .on_open_requested()
            .on_transport_open()
            .on_handshake_sent();
        assert_eq!(state, ConnectionState::Identified);
    }

    async fn recv_kind(server: &mut mock::MockTransport) -> String {
        let raw = timeout(Duration::from_secs(1), server.recv())
            .await
            .expect("frame within timeout")
            .expect("transport open");
        let value: Value = serde_json::from_str(&raw).unwrap();
        value["kind"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn establish_sends_identify_then_register_name() {
        let (client, mut server) = mock::pair();
        let conn = Connection::establish(client, "ws://test", "alice", "pw")
            .await
            .unwrap();

        assert_eq!(conn.state(), ConnectionState::Identified);
        assert_eq!(recv_kind(&mut server).await, "identify");
        assert_eq!(recv_kind(&mut server).await, "register_name");
    }

    #[tokio::test]
    async fn establish_fails_on_a_dead_transport() {
        let (client, _server) = mock::pair();
        client.disconnect();
        let result = Connection::establish(client, "ws://test", "alice", "pw").await;
        assert!(matches!(result, Err(ConnectionError::Transport(_))));
    }
}
