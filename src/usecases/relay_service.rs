//! Relay: decode for audit, persist, fan out the untouched payload.
//!
//! - Single task owns the receiver map and consumes typed `RelayEvent`s
//! - Decoding runs to completion inside that task; persistence does not
//! - Under `PersistFirst`, broadcast order follows append completion order
//! - On connect, the history snapshot is delivered before any live message
//! - Under `Decoupled`, records are queued without waiting, so a stalled store
//!   never holds up broadcasts

use crate::domain::codec;
use crate::domain::{ChatRecord, ClientId, CodecError, DomainError, EncodedMessage, ServerEvent};
use crate::ports::{ChatStore, ReceiverPort, RelayInbound};
use crate::usecases::persist_worker::{PendingRecord, PersistWorker, RetryPolicy};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Inbound events, in the order the relay handles them.
pub enum RelayEvent {
    Connect {
        client: ClientId,
        receiver: Arc<dyn ReceiverPort>,
    },
    Message {
        client: ClientId,
        message: EncodedMessage,
    },
    Disconnect {
        client: ClientId,
    },
    /// Stop accepting events; queued ones are still handled.
    Shutdown,
}

/// How a message's broadcast depends on storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Append first; broadcast only on success. A failed append drops the
    /// broadcast and the origin is told its message was not delivered.
    PersistFirst,
    /// Broadcast immediately; a background worker appends with retries.
    Decoupled(RetryPolicy),
}

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub history_limit: usize,
    pub delivery: DeliveryPolicy,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            history_limit: crate::shared::config::DEFAULT_HISTORY_LIMIT,
            delivery: DeliveryPolicy::PersistFirst,
        }
    }
}

/// Cloneable sender side of the relay's event queue.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayEvent>,
}

impl RelayHandle {
    /// Create the event queue. Pass the receiver to `RelayService::new`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    async fn send(&self, event: RelayEvent) -> Result<(), DomainError> {
        self.tx.send(event).await.map_err(|_| DomainError::RelayClosed)
    }

    /// Ask the relay to wind down. `run` returns once pending appends settle
    /// and the persist worker has drained its backlog.
    pub async fn shutdown(&self) -> Result<(), DomainError> {
        self.send(RelayEvent::Shutdown).await
    }
}

#[async_trait::async_trait]
impl RelayInbound for RelayHandle {
    async fn connect(
        &self,
        client: ClientId,
        receiver: Arc<dyn ReceiverPort>,
    ) -> Result<(), DomainError> {
        self.send(RelayEvent::Connect { client, receiver }).await
    }

    async fn submit(&self, client: ClientId, message: EncodedMessage) -> Result<(), DomainError> {
        self.send(RelayEvent::Message { client, message }).await
    }

    async fn disconnect(&self, client: ClientId) -> Result<(), DomainError> {
        self.send(RelayEvent::Disconnect { client }).await
    }
}

/// Completion of a persist-first append, reported back to the relay task.
struct Persisted {
    origin: ClientId,
    message: EncodedMessage,
    result: Result<ChatRecord, DomainError>,
}

/// Relay service. Runs as one task; see module docs for ordering.
pub struct RelayService {
    store: Arc<dyn ChatStore>,
    settings: RelaySettings,
    rx: mpsc::Receiver<RelayEvent>,
    receivers: BTreeMap<ClientId, Arc<dyn ReceiverPort>>,
    in_flight: usize,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        settings: RelaySettings,
        rx: mpsc::Receiver<RelayEvent>,
    ) -> Self {
        Self {
            store,
            settings,
            rx,
            receivers: BTreeMap::new(),
            in_flight: 0,
        }
    }

    /// Run until shutdown is requested or every `RelayHandle` is dropped, then
    /// wait for pending appends to settle.
    pub async fn run(mut self) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Persisted>();
        let (persist_tx, worker): (_, Option<JoinHandle<()>>) = match self.settings.delivery {
            DeliveryPolicy::Decoupled(retry) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = PersistWorker::new(Arc::clone(&self.store), rx, retry);
                (Some(tx), Some(tokio::spawn(worker.run())))
            }
            DeliveryPolicy::PersistFirst => (None, None),
        };

        info!(
            history_limit = self.settings.history_limit,
            delivery = ?self.settings.delivery,
            "relay started"
        );

        let mut inbound_open = true;
        while inbound_open || self.in_flight > 0 {
            tokio::select! {
                event = self.rx.recv(), if inbound_open => match event {
                    Some(RelayEvent::Shutdown) => {
                        info!("relay shutting down");
                        // Buffered events still come through; recv then yields None.
                        self.rx.close();
                    }
                    Some(event) => self.handle(event, &done_tx, persist_tx.as_ref()).await,
                    None => inbound_open = false,
                },
                Some(done) = done_rx.recv() => self.on_persisted(done),
            }
        }

        drop(persist_tx);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "persist worker aborted");
            }
        }
        info!("relay stopped");
    }

    async fn handle(
        &mut self,
        event: RelayEvent,
        done_tx: &mpsc::UnboundedSender<Persisted>,
        persist_tx: Option<&mpsc::UnboundedSender<PendingRecord>>,
    ) {
        match event {
            RelayEvent::Connect { client, receiver } => self.on_connect(client, receiver).await,
            RelayEvent::Message { client, message } => {
                self.on_message(client, message, done_tx, persist_tx)
            }
            RelayEvent::Disconnect { client } => {
                if self.receivers.remove(&client).is_some() {
                    info!(client = %client, connected = self.receivers.len(), "client disconnected");
                }
            }
            RelayEvent::Shutdown => {}
        }
    }

    async fn on_connect(&mut self, client: ClientId, receiver: Arc<dyn ReceiverPort>) {
        let history = match self.store.recent(self.settings.history_limit).await {
            Ok(records) => records,
            Err(e) => {
                error!(client = %client, error = %e, "failed to load chat history");
                Vec::new()
            }
        };
        let count = history.len();
        if receiver.deliver(ServerEvent::History(history)).is_err() {
            debug!(client = %client, "client left before history was delivered");
            return;
        }
        self.receivers.insert(client, receiver);
        info!(
            client = %client,
            history = count,
            connected = self.receivers.len(),
            "client connected"
        );
    }

    fn on_message(
        &mut self,
        origin: ClientId,
        message: EncodedMessage,
        done_tx: &mpsc::UnboundedSender<Persisted>,
        persist_tx: Option<&mpsc::UnboundedSender<PendingRecord>>,
    ) {
        let text = match codec::decode_message(&message.code_table, &message.bit_string) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                let e = CodecError::EmptyInput;
                warn!(client = %origin, sender = %message.sender, error = %e, "dropping empty message");
                self.reject(origin, &e.to_string());
                return;
            }
            Err(e) => {
                warn!(client = %origin, sender = %message.sender, error = %e, "dropping undecodable message");
                self.reject(origin, &e.to_string());
                return;
            }
        };
        info!(
            client = %origin,
            sender = %message.sender,
            bits = message.bit_string.len(),
            chars = text.chars().count(),
            "decoded message"
        );

        match persist_tx {
            None => {
                self.in_flight += 1;
                let store = Arc::clone(&self.store);
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let result = store.append(&message.sender, &text).await;
                    let _ = done_tx.send(Persisted {
                        origin,
                        message,
                        result,
                    });
                });
            }
            Some(persist_tx) => {
                let record = PendingRecord {
                    sender: message.sender.clone(),
                    text,
                };
                self.broadcast(ServerEvent::Message(message));
                if persist_tx.send(record).is_err() {
                    error!(client = %origin, "persist worker stopped; message not stored");
                }
            }
        }
    }

    fn on_persisted(&mut self, done: Persisted) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match done.result {
            Ok(record) => {
                debug!(sender = %record.sender, at = %record.timestamp, "message persisted");
                self.broadcast(ServerEvent::Message(done.message));
            }
            Err(e) => {
                error!(client = %done.origin, error = %e, "persist failed; broadcast dropped");
                self.reject(done.origin, &format!("message could not be stored: {}", e));
            }
        }
    }

    /// Deliver to every receiver, pruning the ones whose outbox is gone.
    fn broadcast(&mut self, event: ServerEvent) {
        let mut gone = Vec::new();
        for (client, receiver) in &self.receivers {
            if receiver.deliver(event.clone()).is_err() {
                gone.push(*client);
            }
        }
        for client in gone {
            self.receivers.remove(&client);
            debug!(client = %client, "pruned closed receiver");
        }
        debug!(receivers = self.receivers.len(), "broadcast message");
    }

    fn reject(&mut self, client: ClientId, reason: &str) {
        if let Some(receiver) = self.receivers.get(&client) {
            let event = ServerEvent::Rejected {
                reason: reason.to_string(),
            };
            if receiver.deliver(event).is_err() {
                self.receivers.remove(&client);
            }
        }
    }
}
