//! In-process chat store. Same retention rule as the SQLite store; nothing survives a restart.

use crate::domain::{ChatRecord, DomainError};
use crate::ports::ChatStore;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::RwLock;

pub struct MemoryRepo {
    records: RwLock<Vec<ChatRecord>>,
    retention: Duration,
}

impl MemoryRepo {
    /// Store with the default 24 hour retention.
    pub fn new() -> Self {
        Self::with_retention(Duration::from_secs(
            crate::shared::config::DEFAULT_RETENTION_SECS,
        ))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            retention,
        }
    }

    /// Insert a record with an explicit timestamp (seeding, backfill).
    pub async fn append_at(&self, sender: &str, text: &str, timestamp: DateTime<Utc>) {
        let record = ChatRecord {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp,
        };
        let mut records = self.records.write().await;
        let at = records.partition_point(|r| r.timestamp <= timestamp);
        records.insert(at, record);
    }

    fn is_live(&self, record: &ChatRecord, now: DateTime<Utc>) -> bool {
        let retention = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        record.timestamp.timestamp_millis() >= now.timestamp_millis().saturating_sub(retention)
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatStore for MemoryRepo {
    async fn append(&self, sender: &str, text: &str) -> Result<ChatRecord, DomainError> {
        let record = ChatRecord {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DomainError> {
        let now = Utc::now();
        let records = self.records.read().await;
        let live: Vec<&ChatRecord> = records.iter().filter(|r| self.is_live(r, now)).collect();
        let skip = live.len().saturating_sub(limit);
        Ok(live.into_iter().skip(skip).cloned().collect())
    }

    async fn purge_expired(&self) -> Result<u64, DomainError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| self.is_live(r, now));
        Ok((before - records.len()) as u64)
    }
}
