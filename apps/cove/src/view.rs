//! Active-channel tracking and cache replay into the render sink.

use tracing::debug;

use crate::cache::ChannelCache;
use crate::protocol::ChannelId;

/// The channel currently rendered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveChannel {
    Channel(ChannelId),
    /// Free-text entry mode; has no cache key of its own.
    Manual,
}

impl ActiveChannel {
    pub fn matches(&self, channel: &str) -> bool {
        matches!(self, ActiveChannel::Channel(active) if active == channel)
    }
}

/// Where rendered lines go. The terminal front end implements this over
/// stdout; tests capture output instead.
pub trait RenderSink {
    fn render_line(&mut self, text: &str);
    fn clear_log(&mut self);
    fn set_channel_options(&mut self, channels: &[ChannelId], selected: &ActiveChannel);
}

/// Tracks the active channel and replays cached logs on switch.
pub struct ChannelView<S: RenderSink> {
    active: ActiveChannel,
    listing: Vec<ChannelId>,
    sink: S,
}

impl<S: RenderSink> ChannelView<S> {
    pub fn new(sink: S) -> Self {
        Self {
            active: ActiveChannel::Manual,
            listing: Vec::new(),
            sink,
        }
    }

    pub fn active(&self) -> &ActiveChannel {
        &self.active
    }

    pub fn listing(&self) -> &[ChannelId] {
        &self.listing
    }

    /// Switch the rendered channel. A concrete channel gets its full cached
    /// log replayed from scratch; manual mode just clears the pane.
    pub fn select(&mut self, selection: ActiveChannel, cache: &ChannelCache) {
        self.active = selection;
        match self.active.clone() {
            ActiveChannel::Manual => self.sink.clear_log(),
            ActiveChannel::Channel(id) => self.replay(&id, cache),
        }
    }

    /// Full re-render of `channel`'s cached log: clear first, then every
    /// line in cache order. Not an incremental append.
    pub fn replay(&mut self, channel: &str, cache: &ChannelCache) {
        self.sink.clear_log();
        for message in cache.get(channel) {
            self.sink
                .render_line(&format!("{}: {}", message.author, message.content));
        }
    }

    /// Wholesale replacement of the known channel set. An empty response is
    /// a no-update, not a clear.
    pub fn update_listing(&mut self, channels: Vec<ChannelId>) {
        if channels.is_empty() {
            debug!(target: "cove::view", "empty channel listing; keeping previous options");
            return;
        }
        self.listing = channels;
        self.sink.set_channel_options(&self.listing, &self.active);
    }

    /// Render a connection notice without touching any cache.
    pub fn notice(&mut self, text: &str) {
        self.sink.render_line(text);
    }
}
