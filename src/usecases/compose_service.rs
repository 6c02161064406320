//! Sender side of the message protocol.
//!
//! Builds a private tree per message, keeps only its code table, and emits
//! the `{codeTable, bitString, sender}` payload.

use crate::domain::codec;
use crate::domain::{CodecError, DomainError, EncodedMessage};
use tracing::debug;

/// Encodes outgoing messages for one sender.
pub struct MessageComposer {
    sender: String,
}

impl MessageComposer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Encode `text` with a fresh code table.
    ///
    /// Empty text is rejected here, before any frequency analysis.
    pub fn compose(&self, text: &str) -> Result<EncodedMessage, DomainError> {
        if text.is_empty() {
            return Err(CodecError::EmptyInput.into());
        }
        let (code_table, bit_string) = codec::encode_message(text)?;
        debug!(
            sender = %self.sender,
            chars = text.chars().count(),
            symbols = code_table.len(),
            bits = bit_string.len(),
            "composed message"
        );
        Ok(EncodedMessage {
            code_table,
            bit_string,
            sender: self.sender.clone(),
        })
    }
}
