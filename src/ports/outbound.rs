//! Outbound ports. The relay calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{ChatRecord, DomainError, ServerEvent};
use tokio::sync::mpsc;

/// Persistence sink for decoded messages.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a decoded message. The store assigns the timestamp.
    async fn append(&self, sender: &str, text: &str) -> Result<ChatRecord, DomainError>;

    /// Up to `limit` most recent records still inside the retention window,
    /// oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DomainError>;

    /// Delete records past retention. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64, DomainError> {
        Ok(0)
    }
}

/// One connected receiver. Delivery must not block the relay.
pub trait ReceiverPort: Send + Sync {
    /// Queue `event` for the receiver. An error means the receiver is gone.
    fn deliver(&self, event: ServerEvent) -> Result<(), DomainError>;
}

impl ReceiverPort for mpsc::UnboundedSender<ServerEvent> {
    fn deliver(&self, event: ServerEvent) -> Result<(), DomainError> {
        self.send(event)
            .map_err(|_| DomainError::Transport("receiver outbox closed".into()))
    }
}
