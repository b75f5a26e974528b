//! Per-channel message retention.
//!
//! The cache is the memory of the client: every deliverable chat message is
//! appended to its channel's log in arrival order, and switching channels
//! replays a log from here rather than asking the server again. A channel
//! key exists iff at least one message has been cached for it. There is no
//! deduplication and no eviction: `leave` does not remove a channel's log,
//! and the cache grows for the lifetime of the session.

use std::collections::HashMap;

use crate::protocol::ChannelId;

/// One cached chat message, author already resolved by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChannelCache {
    entries: HashMap<ChannelId, Vec<ChatMessage>>,
}

impl ChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to `channel`'s log, creating the log on first use.
    pub fn append(&mut self, channel: &str, message: ChatMessage) {
        self.entries
            .entry(channel.to_string())
            .or_default()
            .push(message);
    }

    /// Messages cached for `channel` in arrival order. Unknown channels
    /// yield an empty slice, never an error.
    pub fn get(&self, channel: &str) -> &[ChatMessage] {
        self.entries.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.entries.contains_key(channel)
    }

    pub fn len(&self, channel: &str) -> usize {
        self.get(channel).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_order_is_preserved() {
        let mut cache = ChannelCache::new();
        cache.append("general", ChatMessage::new("bob", "one"));
        cache.append("general", ChatMessage::new("me", "two"));
        cache.append("general", ChatMessage::new("bob", "three"));

        let contents: Vec<&str> = cache
            .get("general")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[test]
    fn unknown_channel_reads_empty() {
        let cache = ChannelCache::new();
        assert!(cache.get("nowhere").is_empty());
        assert!(!cache.contains("nowhere"));
    }

    #[test]
    fn key_exists_only_after_first_append() {
        let mut cache = ChannelCache::new();
        assert!(!cache.contains("general"));
        cache.append("general", ChatMessage::new("bob", "hi"));
        assert!(cache.contains("general"));
    }

    #[test]
    fn identical_messages_are_not_deduplicated() {
        let mut cache = ChannelCache::new();
        cache.append("general", ChatMessage::new("me", "hi"));
        cache.append("general", ChatMessage::new("me", "hi"));
        assert_eq!(cache.len("general"), 2);
    }
}
