//! Async task: reads decoded messages from an mpsc channel and appends them to the store.
//!
//! Used when delivery is decoupled from persistence. Broadcast has already
//! happened, so a failed append is retried with backoff and finally logged.

use crate::domain::DomainError;
use crate::ports::ChatStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A decoded message waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    pub sender: String,
    pub text: String,
}

/// Append attempts and backoff for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay before the second attempt; doubled for each later one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Persist worker. Consumes channel and appends via ChatStore, one record at a time.
///
/// The queue is unbounded so the relay never waits on a slow or failing store.
pub struct PersistWorker {
    store: Arc<dyn ChatStore>,
    rx: mpsc::UnboundedReceiver<PendingRecord>,
    retry: RetryPolicy,
}

impl PersistWorker {
    pub fn new(
        store: Arc<dyn ChatStore>,
        rx: mpsc::UnboundedReceiver<PendingRecord>,
        retry: RetryPolicy,
    ) -> Self {
        Self { store, rx, retry }
    }

    /// Run the worker. Processes until channel is closed and the backlog is drained.
    pub async fn run(mut self) {
        while let Some(record) = self.rx.recv().await {
            if let Err(e) = Self::persist_one(&*self.store, &record, self.retry).await {
                error!(sender = %record.sender, error = %e, "giving up on persisting message");
            }
        }
        info!("persist worker finished (channel closed)");
    }

    async fn persist_one(
        store: &dyn ChatStore,
        record: &PendingRecord,
        retry: RetryPolicy,
    ) -> Result<(), DomainError> {
        let mut delay = retry.base_delay;
        let mut attempt = 1;
        loop {
            match store.append(&record.sender, &record.text).await {
                Ok(_) => {
                    debug!(sender = %record.sender, attempt, "message persisted");
                    return Ok(());
                }
                Err(e) if attempt < retry.attempts => {
                    warn!(
                        sender = %record.sender,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "persist failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
