//! Domain entities. Pure data structures for the core business.
//!
//! No socket/database types here — adapters map to and from these.

use crate::domain::codec::CodeTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection-scoped identifier assigned by a transport adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Wire payload of a chat message. Carries the code table, never the tree
/// and never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedMessage {
    pub code_table: CodeTable,
    pub bit_string: String,
    pub sender: String,
}

/// A decoded message as persisted by the chat store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub sender: String,
    #[serde(rename = "message")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    Message(EncodedMessage),
}

/// Events the relay pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// One-shot snapshot sent on connect, oldest record first.
    History(Vec<ChatRecord>),
    /// A relayed message, byte-for-byte as the sender produced it.
    Message(EncodedMessage),
    /// Sent only to the origin when its message was not relayed.
    Rejected { reason: String },
}
