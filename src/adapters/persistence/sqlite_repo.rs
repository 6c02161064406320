//! SQLite-backed chat store via libsql. Implements ChatStore.
//!
//! Single `chats` table; timestamps are unix milliseconds. Records older than
//! the retention window are filtered out of reads and removed by `purge_expired`.
//! Database file: {data_dir}/chats.db
//!
//! Appends and purges go through one shared writer connection behind a mutex, so
//! concurrent appends queue in-process instead of racing for the SQLite write lock.
//! Every connection also sets `busy_timeout` for writers in other processes.

use crate::domain::{ChatRecord, DomainError};
use crate::ports::ChatStore;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u64 = 5_000;

const CHATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    message TEXT NOT NULL,
    timestamp INTEGER NOT NULL
)"#;
const CHATS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_chats_timestamp ON chats (timestamp)";

fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Persistence(e.to_string())
}

/// PRAGMA returns a row (new value); use query and consume rows (execute fails when rows are returned).
async fn apply_pragmas(conn: &Connection, pragmas: &[&str]) -> Result<(), DomainError> {
    for pragma in pragmas {
        let mut rows = conn
            .query(pragma, ())
            .await
            .map_err(|e| DomainError::Persistence(format!("{} failed: {}", pragma, e)))?;
        while rows.next().await.map_err(repo_err)?.is_some() {}
    }
    Ok(())
}

/// SQLite chat store. One database file (chats.db) in the given base directory.
pub struct SqliteRepo {
    db: Database,
    writer: Mutex<Connection>,
    db_path: PathBuf,
    retention: Duration,
}

impl SqliteRepo {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    ///
    /// Sets WAL mode and synchronous=NORMAL so history reads do not wait on appends.
    pub async fn connect(
        base_dir: impl AsRef<Path>,
        retention: Duration,
    ) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(repo_err)?;
        let db_path = base.join("chats.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;
        let busy_timeout = format!("PRAGMA busy_timeout={}", BUSY_TIMEOUT_MS);
        apply_pragmas(
            &conn,
            &[
                "PRAGMA journal_mode=WAL",
                "PRAGMA synchronous=NORMAL",
                busy_timeout.as_str(),
            ],
        )
        .await?;

        conn.execute(CHATS_TABLE, ()).await.map_err(repo_err)?;
        conn.execute(CHATS_INDEX, ()).await.map_err(repo_err)?;

        info!(
            path = %db_path.display(),
            retention_secs = retention.as_secs(),
            "SQLite chat store connected with WAL mode"
        );

        Ok(Self {
            db,
            writer: Mutex::new(conn),
            db_path,
            retention,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Fresh connection for reads. WAL lets these run alongside the writer.
    async fn reader(&self) -> Result<Connection, DomainError> {
        let conn = self.db.connect().map_err(repo_err)?;
        let busy_timeout = format!("PRAGMA busy_timeout={}", BUSY_TIMEOUT_MS);
        apply_pragmas(&conn, &[busy_timeout.as_str()]).await?;
        Ok(conn)
    }

    fn cutoff_millis(&self) -> i64 {
        let retention = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        Utc::now().timestamp_millis().saturating_sub(retention)
    }
}

#[async_trait::async_trait]
impl ChatStore for SqliteRepo {
    async fn append(&self, sender: &str, text: &str) -> Result<ChatRecord, DomainError> {
        let conn = self.writer.lock().await;
        let now = Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO chats (sender, message, timestamp) VALUES (?1, ?2, ?3)",
            params![sender, text, now],
        )
        .await
        .map_err(repo_err)?;
        debug!(sender, chars = text.chars().count(), "chat record appended");
        Ok(ChatRecord {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: DateTime::from_timestamp_millis(now).unwrap_or_else(Utc::now),
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DomainError> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT sender, message, timestamp
                FROM chats
                WHERE timestamp >= ?1
                ORDER BY timestamp DESC, id DESC
                LIMIT ?2
                "#,
                params![self.cutoff_millis(), limit as i64],
            )
            .await
            .map_err(repo_err)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let sender: String = row.get(0).map_err(repo_err)?;
            let text: String = row.get(1).map_err(repo_err)?;
            let millis: i64 = row.get(2).map_err(repo_err)?;
            let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                DomainError::Persistence(format!("timestamp out of range: {}", millis))
            })?;
            records.push(ChatRecord {
                sender,
                text,
                timestamp,
            });
        }
        records.reverse();
        Ok(records)
    }

    async fn purge_expired(&self) -> Result<u64, DomainError> {
        let conn = self.writer.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM chats WHERE timestamp < ?1",
                params![self.cutoff_millis()],
            )
            .await
            .map_err(repo_err)?;
        if removed > 0 {
            info!(removed, "purged expired chat records");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(60 * 60 * 24);

    #[tokio::test]
    async fn appends_and_reads_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path(), DAY).await.unwrap();
        for text in ["one", "two", "three"] {
            repo.append("ann", text).await.unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
        assert!(repo.path().ends_with("chats.db"));
    }

    #[tokio::test]
    async fn records_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = SqliteRepo::connect(dir.path(), DAY).await.unwrap();
            repo.append("bob", "persisted").await.unwrap();
        }
        let repo = SqliteRepo::connect(dir.path(), DAY).await.unwrap();
        let recent = repo.recent(50).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].sender, "bob");
    }

    #[tokio::test]
    async fn expired_records_are_hidden_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path(), Duration::ZERO).await.unwrap();
        repo.append("ann", "short-lived").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(repo.recent(50).await.unwrap().is_empty());
        assert_eq!(repo.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = std::sync::Arc::new(SqliteRepo::connect(dir.path(), DAY).await.unwrap());

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let repo = std::sync::Arc::clone(&repo);
                tokio::spawn(async move { repo.append("ann", &format!("m{}", i)).await })
            })
            .collect();
        let mut failures = Vec::new();
        for task in tasks {
            if let Err(e) = task.await.unwrap() {
                failures.push(e.to_string());
            }
        }

        assert!(failures.is_empty(), "failed appends: {:?}", failures.first());
        assert_eq!(repo.recent(500).await.unwrap().len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_run_while_appends_are_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let repo = std::sync::Arc::new(SqliteRepo::connect(dir.path(), DAY).await.unwrap());

        let writer = {
            let repo = std::sync::Arc::clone(&repo);
            tokio::spawn(async move {
                for i in 0..100 {
                    repo.append("ann", &format!("m{}", i)).await.unwrap();
                }
            })
        };
        for _ in 0..20 {
            repo.recent(50).await.unwrap();
        }
        writer.await.unwrap();
        assert_eq!(repo.recent(50).await.unwrap().len(), 50);
    }
}
