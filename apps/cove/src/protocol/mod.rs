use serde::{Deserialize, Serialize};

pub mod wire;

pub use wire::{DecodeError, EncodeError, decode, encode};

pub type ChannelId = String;

/// `code` value the server attaches to an invalid-credential rejection.
pub const AUTH_REJECTED_CODE: &str = "4";

/// Author sentinel for the user's own messages.
pub const LOCAL_AUTHOR: &str = "me";

/// Commands sent from the client to the chat server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Command {
    Identify {
        name: String,
    },
    RegisterName {
        passwd: String,
    },
    Join {
        #[serde(rename = "where")]
        target: ChannelId,
    },
    Leave {
        #[serde(rename = "where")]
        target: ChannelId,
    },
    Send {
        #[serde(rename = "where")]
        target: ChannelId,
        content: String,
    },
    ListChannels {},
}

/// One decoded inbound envelope.
///
/// `error` and `code` ride at the top level of the wire envelope, next to
/// the kind; they are only ever present on inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub frame: Frame,
    pub error: Option<String>,
    pub code: Option<String>,
}

/// The closed set of recognized inbound kinds.
///
/// `Unknown` keeps matching exhaustive without making unrecognized kinds a
/// decode failure: the server is free to grow its vocabulary, and adding a
/// variant here forces every routing match to be revisited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Handshake acknowledgment; carries no data.
    Identified,
    /// A deliverable chat message (wire kinds `message` and `send`).
    Chat(ChatFrame),
    /// Response to a `list_channels` command.
    ChannelList { channels: Vec<ChannelId> },
    /// Acknowledgment of a `leave` command.
    LeaveAck,
    /// Structurally valid envelope with an unrecognized (or absent) kind.
    Unknown(String),
}

/// Payload of a chat message envelope. `author` is absent on the client's
/// own messages echoed back by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatFrame {
    #[serde(rename = "where")]
    pub channel: ChannelId,
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
}
