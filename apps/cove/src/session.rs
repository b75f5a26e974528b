//! The per-session context object tying the client together.
//!
//! One `ChatSession` per connected session: it owns the connection, the
//! per-channel cache, the view state and the local identity, so tests can
//! stand up several sessions side by side without any process-wide state.

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::ChannelCache;
use crate::connection::{Connection, ConnectionError, ConnectionState};
use crate::dispatch::{Dispatcher, RouteOutcome};
use crate::protocol::{self, ChannelId, ChatFrame, Command, Frame, Inbound};
use crate::transport::Transport;
use crate::view::{ActiveChannel, ChannelView, RenderSink};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Connection(#[from] ConnectionError),
    #[error("password rejected by server; restart the client to try again")]
    AuthRejected,
    #[error("no channel name given for a manual send")]
    EmptyManualChannel,
}

/// Where an outbound message should go: a selected channel, or whatever the
/// user typed into the manual field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    Channel(ChannelId),
    ManualText(String),
}

pub struct ChatSession<T: Transport, S: RenderSink> {
    connection: Connection<T>,
    cache: ChannelCache,
    dispatcher: Dispatcher,
    view: ChannelView<S>,
}

impl<T: Transport, S: RenderSink> ChatSession<T, S> {
    /// Open a session over an already-connected transport: runs the
    /// identify/register handshake and renders the connected notice.
    pub async fn establish(
        transport: T,
        server_url: &str,
        name: &str,
        passwd: &str,
        sink: S,
    ) -> Result<Self, SessionError> {
        let connection = Connection::establish(transport, server_url, name, passwd).await?;
        let mut view = ChannelView::new(sink);
        view.notice(&format!("Connected to: {server_url}"));
        Ok(Self {
            connection,
            cache: ChannelCache::new(),
            dispatcher: Dispatcher::new(name),
            view,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn cache(&self) -> &ChannelCache {
        &self.cache
    }

    pub fn active_channel(&self) -> &ActiveChannel {
        self.view.active()
    }

    pub fn channel_listing(&self) -> &[ChannelId] {
        self.view.listing()
    }

    /// Pump one inbound frame. Returns `Ok(false)` once the transport has
    /// closed and the disconnected notice has been rendered.
    pub async fn pump(&mut self) -> Result<bool, SessionError> {
        match self.connection.recv().await {
            Some(text) => {
                self.handle_frame(&text)?;
                Ok(true)
            }
            None => {
                self.on_disconnected();
                Ok(false)
            }
        }
    }

    /// Decode and route one raw inbound frame. Malformed frames are logged
    /// and dropped; the transport is otherwise trusted. Only a credential
    /// rejection surfaces as an error.
    pub fn handle_frame(&mut self, text: &str) -> Result<(), SessionError> {
        let inbound = match protocol::decode(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(target: "cove::session", %err, "dropping malformed frame");
                return Ok(());
            }
        };
        self.route(inbound)
    }

    fn route(&mut self, inbound: Inbound) -> Result<(), SessionError> {
        match self.dispatcher.route(&mut self.cache, inbound) {
            RouteOutcome::Cached { channel } => {
                // Cache write done; replay is a separate concern, and only
                // when the affected channel is the one on screen.
                if self.view.active().matches(&channel) {
                    self.view.replay(&channel, &self.cache);
                }
                Ok(())
            }
            RouteOutcome::ChannelList { channels } => {
                self.view.update_listing(channels);
                Ok(())
            }
            RouteOutcome::AuthRejected => {
                self.connection.fail_auth();
                Err(SessionError::AuthRejected)
            }
            RouteOutcome::HandshakeAck | RouteOutcome::Dropped(_) => Ok(()),
        }
    }

    /// User selected a channel or the manual entry mode.
    pub fn select_channel(&mut self, selection: ActiveChannel) {
        self.view.select(selection, &self.cache);
    }

    /// Send a chat message. The target channel is joined first (sending
    /// implies membership, effective immediately), then the envelope is fed
    /// back through the dispatcher so the user's own line shows up without
    /// waiting for a server round trip.
    pub async fn send_message(
        &mut self,
        target: SendTarget,
        content: &str,
    ) -> Result<(), SessionError> {
        let channel = match target {
            SendTarget::Channel(id) => id,
            SendTarget::ManualText(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    // Rejected before any network effect.
                    return Err(SessionError::EmptyManualChannel);
                }
                trimmed.to_string()
            }
        };

        self.connection
            .send(&Command::Join {
                target: channel.clone(),
            })
            .await?;
        self.connection
            .send(&Command::Send {
                target: channel.clone(),
                content: content.to_string(),
            })
            .await?;

        // Optimistic local echo through the same routing path as wire
        // traffic; no author means "me".
        let echo = Inbound {
            frame: Frame::Chat(ChatFrame {
                channel,
                author: None,
                content: content.to_string(),
            }),
            error: None,
            code: None,
        };
        self.route(echo)
    }

    /// Ask the server for the channel listing. The response is routed by
    /// its dedicated kind, so chat traffic keeps flowing meanwhile.
    pub async fn request_channel_list(&mut self) -> Result<(), SessionError> {
        self.connection.send(&Command::ListChannels {}).await?;
        Ok(())
    }

    /// Join a channel; treated as effective immediately for sends.
    pub async fn join(&mut self, channel: &str) -> Result<(), SessionError> {
        self.connection
            .send(&Command::Join {
                target: channel.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Leave a channel. The cached log is deliberately retained.
    pub async fn leave(&mut self, channel: &str) -> Result<(), SessionError> {
        self.connection
            .send(&Command::Leave {
                target: channel.to_string(),
            })
            .await?;
        Ok(())
    }

    fn on_disconnected(&mut self) {
        info!(
            target: "cove::session",
            server = %self.connection.server_url(),
            "transport closed"
        );
        let notice = format!("Disconnected from {}", self.connection.server_url());
        self.view.notice(&notice);
    }
}
