use serde::{Deserialize, Serialize};

/// Device descriptor announced during the handshake.
#[derive(Debug, Serialize)]
pub struct InitMessage<'a> {
    pub message: &'static str,
    pub name: &'a str,
    pub tag: String,
    pub uniqueid: &'a str,
    pub group: i64,
    pub sync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimmable: Option<bool>,
}

/// Client → server value push, followed by [`SyncedMessage`].
#[derive(Debug, Serialize)]
pub struct ChannelPush {
    pub message: &'static str,
    pub tag: String,
    pub index: u32,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct SyncedMessage {
    pub message: &'static str,
    pub tag: String,
}

/// Server → client messages, discriminated by the `message` key.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "message")]
pub enum ServerMessage {
    #[serde(rename = "status")]
    Status {
        status: String,
        #[serde(default)]
        errormessage: Option<String>,
    },
    #[serde(rename = "channel")]
    Channel {
        tag: serde_json::Value,
        value: f64,
    },
    #[serde(rename = "sync")]
    Sync { tag: serde_json::Value },
}

/// Tags travel as strings in our direction but some servers answer with
/// numbers; accept both.
pub fn tag_index(tag: &serde_json::Value) -> Option<usize> {
    match tag {
        serde_json::Value::String(text) => text.parse().ok(),
        serde_json::Value::Number(number) => number.as_u64().map(|value| value as usize),
        _ => None,
    }
}
