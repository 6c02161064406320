//! Inbound port. Transport adapters call into the relay.

use crate::domain::{ClientId, DomainError, EncodedMessage};
use crate::ports::ReceiverPort;
use std::sync::Arc;

/// Entry point for connection lifecycle and inbound messages.
#[async_trait::async_trait]
pub trait RelayInbound: Send + Sync {
    /// Register a receiver. It gets the history snapshot, then live broadcasts.
    async fn connect(
        &self,
        client: ClientId,
        receiver: Arc<dyn ReceiverPort>,
    ) -> Result<(), DomainError>;

    /// Submit a message for decoding, persistence and fan-out.
    async fn submit(&self, client: ClientId, message: EncodedMessage) -> Result<(), DomainError>;

    /// Stop delivering to `client`.
    async fn disconnect(&self, client: ClientId) -> Result<(), DomainError>;
}
