use serde::Deserialize;
use serde_json::Value;

use super::{ChatFrame, Command, Frame, Inbound};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not a well-formed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("`{kind}` envelope carries invalid data: {source}")]
    InvalidData {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire shape of every inbound envelope before classification. The server
/// omits `kind` and `data` entirely on bare error replies, and `code` shows
/// up as either a string or a number depending on the reply path.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

#[derive(Deserialize)]
struct ChannelListData {
    #[serde(default)]
    channels: Vec<String>,
}

/// Serialize one outbound command to its wire text.
pub fn encode(command: &Command) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(command)?)
}

/// Parse and classify one inbound text frame.
///
/// Unrecognized kinds decode to [`Frame::Unknown`]; they are not errors.
/// A recognized kind with unusable data only fails the decode when the
/// envelope does not carry a server error: error replies reuse chat kinds
/// without chat payloads and are dropped by routing anyway.
pub fn decode(text: &str) -> Result<Inbound, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let frame = match raw.kind.as_str() {
        "identified" => Frame::Identified,
        "message" | "send" => match serde_json::from_value::<ChatFrame>(raw.data) {
            Ok(chat) => Frame::Chat(chat),
            Err(_) if raw.error.is_some() => Frame::Unknown(raw.kind),
            Err(source) => {
                return Err(DecodeError::InvalidData {
                    kind: raw.kind,
                    source,
                });
            }
        },
        "list_channels" => match serde_json::from_value::<ChannelListData>(raw.data) {
            Ok(data) => Frame::ChannelList {
                channels: data.channels,
            },
            Err(_) if raw.error.is_some() => Frame::Unknown(raw.kind),
            Err(source) => {
                return Err(DecodeError::InvalidData {
                    kind: raw.kind,
                    source,
                });
            }
        },
        "leave" => Frame::LeaveAck,
        _ => Frame::Unknown(raw.kind),
    };

    Ok(Inbound {
        frame,
        error: raw.error,
        code: raw.code.as_ref().and_then(normalize_code),
    })
}

// The legacy server emits numeric codes on some paths and strings on others.
fn normalize_code(code: &Value) -> Option<String> {
    match code {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}
