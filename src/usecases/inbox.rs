//! Receiver side of the message protocol.
//!
//! Every `message` event is decoded independently from its own code table.
//! A message that fails to decode still produces a line, so it never silently
//! disappears from one receiver's view while showing up in another's.

use crate::domain::codec;
use crate::domain::{ChatRecord, EncodedMessage, ServerEvent};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineBody {
    Text(String),
    Undecodable { reason: String },
    /// The relay refused one of our own messages.
    Rejected { reason: String },
}

/// One rendered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub sender: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub body: LineBody,
}

impl ChatLine {
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            LineBody::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sender) = &self.sender {
            write!(f, "{}", sender)?;
            if let Some(ts) = &self.timestamp {
                write!(f, " [{}]", ts.format("%H:%M:%S"))?;
            }
            write!(f, ": ")?;
        }
        match &self.body {
            LineBody::Text(t) => write!(f, "{}", t),
            LineBody::Undecodable { reason } => write!(f, "[undecodable message: {}]", reason),
            LineBody::Rejected { reason } => write!(f, "[message not delivered: {}]", reason),
        }
    }
}

/// Client-side view of the conversation.
#[derive(Debug, Default)]
pub struct Inbox {
    lines: Vec<ChatLine>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    /// Apply one server event. `history` replaces the view; the rest append.
    /// Returns the lines added.
    pub fn apply(&mut self, event: ServerEvent) -> &[ChatLine] {
        let start = match event {
            ServerEvent::History(records) => {
                self.lines = records.into_iter().map(history_line).collect();
                0
            }
            ServerEvent::Message(message) => {
                self.lines.push(open(&message));
                self.lines.len() - 1
            }
            ServerEvent::Rejected { reason } => {
                self.lines.push(ChatLine {
                    sender: None,
                    timestamp: None,
                    body: LineBody::Rejected { reason },
                });
                self.lines.len() - 1
            }
        };
        &self.lines[start..]
    }
}

/// Decode one relayed message into a line, falling back to a placeholder.
pub fn open(message: &EncodedMessage) -> ChatLine {
    let body = match codec::decode_message(&message.code_table, &message.bit_string) {
        Ok(text) => LineBody::Text(text),
        Err(e) => {
            warn!(sender = %message.sender, error = %e, "received undecodable message");
            LineBody::Undecodable {
                reason: e.to_string(),
            }
        }
    };
    ChatLine {
        sender: Some(message.sender.clone()),
        timestamp: None,
        body,
    }
}

fn history_line(record: ChatRecord) -> ChatLine {
    ChatLine {
        sender: Some(record.sender),
        timestamp: Some(record.timestamp),
        body: LineBody::Text(record.text),
    }
}
