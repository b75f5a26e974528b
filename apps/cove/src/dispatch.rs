//! Inbound envelope routing.

use tracing::{debug, warn};

use crate::cache::{ChannelCache, ChatMessage};
use crate::protocol::{AUTH_REJECTED_CODE, ChannelId, Frame, Inbound, LOCAL_AUTHOR};

/// What routing did with an envelope. Cache writes happen inside
/// [`Dispatcher::route`]; everything else (replay, listing updates,
/// connection teardown) is the caller's reaction to the outcome, so the two
/// concerns stay independently testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A chat message was appended to `channel`'s log.
    Cached { channel: ChannelId },
    /// A channel listing response arrived.
    ChannelList { channels: Vec<ChannelId> },
    /// The server rejected the credential; the session must be discarded.
    AuthRejected,
    /// Handshake acknowledgment; nothing to do.
    HandshakeAck,
    /// The envelope was logged and dropped.
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The envelope carried a server-reported error; not chat content.
    ProtocolError,
    /// A leave acknowledgment; not chat content.
    LeaveAck,
    /// A structurally valid envelope with an unrecognized kind.
    UnknownKind,
}

/// Classifies each inbound envelope and applies cache insertions.
pub struct Dispatcher {
    local_name: String,
}

impl Dispatcher {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
        }
    }

    /// Route one envelope, in precedence order: credential rejection, then
    /// server errors and leave acks (log and drop), then the recognized
    /// kinds. Unrecognized kinds drop silently.
    pub fn route(&self, cache: &mut ChannelCache, inbound: Inbound) -> RouteOutcome {
        if inbound.code.as_deref() == Some(AUTH_REJECTED_CODE) {
            warn!(target: "cove::dispatch", "credential rejected by server");
            return RouteOutcome::AuthRejected;
        }

        if let Some(error) = inbound.error.as_deref() {
            warn!(target: "cove::dispatch", %error, "server reported an error; dropping envelope");
            return RouteOutcome::Dropped(DropReason::ProtocolError);
        }

        match inbound.frame {
            Frame::LeaveAck => {
                debug!(target: "cove::dispatch", "leave acknowledged");
                RouteOutcome::Dropped(DropReason::LeaveAck)
            }
            Frame::Identified => RouteOutcome::HandshakeAck,
            Frame::Chat(chat) => {
                let author = self.resolve_author(chat.author);
                cache.append(&chat.channel, ChatMessage::new(author, chat.content));
                RouteOutcome::Cached {
                    channel: chat.channel,
                }
            }
            Frame::ChannelList { channels } => RouteOutcome::ChannelList { channels },
            Frame::Unknown(kind) => {
                debug!(target: "cove::dispatch", %kind, "ignoring unrecognized envelope kind");
                RouteOutcome::Dropped(DropReason::UnknownKind)
            }
        }
    }

    // An absent author, or our own name echoed back, renders as "me".
    fn resolve_author(&self, author: Option<String>) -> String {
        match author {
            Some(name) if name != self.local_name => name,
            _ => LOCAL_AUTHOR.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChatFrame;

    fn chat(channel: &str, author: Option<&str>, content: &str) -> Inbound {
        Inbound {
            frame: Frame::Chat(ChatFrame {
                channel: channel.into(),
                author: author.map(Into::into),
                content: content.into(),
            }),
            error: None,
            code: None,
        }
    }

    #[test]
    fn chat_messages_are_cached_under_their_channel() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let outcome = dispatcher.route(&mut cache, chat("general", Some("bob"), "hi"));
        assert_eq!(
            outcome,
            RouteOutcome::Cached {
                channel: "general".into()
            }
        );
        assert_eq!(cache.get("general"), [ChatMessage::new("bob", "hi")]);
    }

    #[test]
    fn absent_author_and_own_name_resolve_to_me() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        dispatcher.route(&mut cache, chat("general", None, "one"));
        dispatcher.route(&mut cache, chat("general", Some("alice"), "two"));
        dispatcher.route(&mut cache, chat("general", Some("bob"), "three"));

        let authors: Vec<&str> = cache
            .get("general")
            .iter()
            .map(|m| m.author.as_str())
            .collect();
        assert_eq!(authors, ["me", "me", "bob"]);
    }

    #[test]
    fn repeated_sends_grow_the_cache_monotonically() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        // Local echo first, then the same content back from the wire.
        dispatcher.route(&mut cache, chat("general", None, "hi"));
        dispatcher.route(&mut cache, chat("general", Some("alice"), "hi"));
        assert_eq!(cache.len("general"), 2);
    }

    #[test]
    fn error_envelopes_never_mutate_the_cache() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let inbound = Inbound {
            frame: Frame::Chat(ChatFrame {
                channel: "general".into(),
                author: Some("bob".into()),
                content: "hi".into(),
            }),
            error: Some("Not in channel".into()),
            code: None,
        };
        let outcome = dispatcher.route(&mut cache, inbound);
        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::ProtocolError));
        assert!(!cache.contains("general"));
    }

    #[test]
    fn credential_rejection_wins_over_everything_else() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let inbound = Inbound {
            frame: Frame::Chat(ChatFrame {
                channel: "general".into(),
                author: None,
                content: "hi".into(),
            }),
            error: Some("Invalid password".into()),
            code: Some("4".into()),
        };
        assert_eq!(
            dispatcher.route(&mut cache, inbound),
            RouteOutcome::AuthRejected
        );
        assert!(!cache.contains("general"));
    }

    #[test]
    fn leave_acks_and_unknown_kinds_are_dropped() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let leave = Inbound {
            frame: Frame::LeaveAck,
            error: None,
            code: None,
        };
        assert_eq!(
            dispatcher.route(&mut cache, leave),
            RouteOutcome::Dropped(DropReason::LeaveAck)
        );

        let unknown = Inbound {
            frame: Frame::Unknown("join".into()),
            error: None,
            code: None,
        };
        assert_eq!(
            dispatcher.route(&mut cache, unknown),
            RouteOutcome::Dropped(DropReason::UnknownKind)
        );
    }

    #[test]
    fn identified_is_a_no_op() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let inbound = Inbound {
            frame: Frame::Identified,
            error: None,
            code: None,
        };
        assert_eq!(
            dispatcher.route(&mut cache, inbound),
            RouteOutcome::HandshakeAck
        );
    }

    #[test]
    fn channel_listing_is_handed_to_the_caller() {
        let dispatcher = Dispatcher::new("alice");
        let mut cache = ChannelCache::new();

        let inbound = Inbound {
            frame: Frame::ChannelList {
                channels: vec!["general".into(), "random".into()],
            },
            error: None,
            code: None,
        };
        assert_eq!(
            dispatcher.route(&mut cache, inbound),
            RouteOutcome::ChannelList {
                channels: vec!["general".into(), "random".into()]
            }
        );
    }
}
