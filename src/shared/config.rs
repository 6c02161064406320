//! Application configuration. Listener address, storage, relay behavior.

use serde::Deserialize;

/// Number of records pushed to a client on connect.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Records older than this are no longer served (24 hours).
pub const DEFAULT_RETENTION_SECS: u64 = 60 * 60 * 24;

/// Capacity of the relay's inbound event queue. Transport readers wait on
/// send().await when the relay falls behind.
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 1024;

/// Longest inbound line a client may send (1 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// How long shutdown waits for the relay to drain pending appends.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Which chat store backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// How delivery relates to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Broadcast only after the record is stored; a store failure drops the broadcast.
    #[default]
    PersistFirst,
    /// Broadcast immediately; store in the background with retries.
    Decoupled,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// TCP address the relay listens on. Read from HUFFCHAT_LISTEN_ADDR.
    #[serde(default)]
    pub listen_addr: Option<String>,

    /// Directory holding chats.db. Read from HUFFCHAT_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default)]
    pub storage: Option<StorageBackend>,

    /// History snapshot size (default 50). Read from HUFFCHAT_HISTORY_LIMIT.
    #[serde(default)]
    pub history_limit: Option<usize>,

    /// Retention window in seconds (default 86400). Read from HUFFCHAT_RETENTION_SECS.
    #[serde(default)]
    pub retention_secs: Option<u64>,

    /// Seconds between expired-record sweeps (default 300).
    #[serde(default)]
    pub purge_interval_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery
    // ─────────────────────────────────────────────────────────────────────────
    /// persist_first | decoupled. Read from HUFFCHAT_DELIVERY.
    #[serde(default)]
    pub delivery: Option<DeliveryMode>,

    /// Append attempts per record in decoupled mode (default 5).
    #[serde(default)]
    pub persist_retry_attempts: Option<u32>,

    /// Initial backoff between append attempts in ms, doubled each retry (default 200).
    #[serde(default)]
    pub persist_retry_delay_ms: Option<u64>,

    #[serde(default)]
    pub event_queue_size: Option<usize>,

    /// Inbound line cap in bytes; longer lines are skipped. Read from HUFFCHAT_MAX_LINE_BYTES.
    #[serde(default)]
    pub max_line_bytes: Option<usize>,

    #[serde(default)]
    pub shutdown_grace_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("HUFFCHAT").try_parsing(true));
        if let Ok(path) = std::env::var("HUFFCHAT_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // PORT is read directly (no prefix) so a bare PORT=3000 in .env keeps working
        if cfg.listen_addr.is_none() {
            if let Ok(s) = std::env::var("PORT") {
                if let Ok(port) = s.parse::<u16>() {
                    cfg.listen_addr = Some(format!("0.0.0.0:{}", port));
                }
            }
        }
        Ok(cfg)
    }

    pub fn listen_addr_or_default(&self) -> String {
        self.listen_addr
            .clone()
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn storage_or_default(&self) -> StorageBackend {
        self.storage.unwrap_or_default()
    }

    pub fn history_limit_or_default(&self) -> usize {
        self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    pub fn retention_secs_or_default(&self) -> u64 {
        self.retention_secs.unwrap_or(DEFAULT_RETENTION_SECS)
    }

    pub fn purge_interval_secs_or_default(&self) -> u64 {
        self.purge_interval_secs.unwrap_or(300).max(1)
    }

    pub fn delivery_or_default(&self) -> DeliveryMode {
        self.delivery.unwrap_or_default()
    }

    pub fn persist_retry_attempts_or_default(&self) -> u32 {
        self.persist_retry_attempts.unwrap_or(5).max(1)
    }

    pub fn persist_retry_delay_ms_or_default(&self) -> u64 {
        self.persist_retry_delay_ms.unwrap_or(200)
    }

    pub fn event_queue_size_or_default(&self) -> usize {
        self.event_queue_size
            .unwrap_or(DEFAULT_EVENT_QUEUE_SIZE)
            .max(1)
    }

    pub fn max_line_bytes_or_default(&self) -> usize {
        self.max_line_bytes.unwrap_or(DEFAULT_MAX_LINE_BYTES).max(1)
    }

    pub fn shutdown_grace_secs_or_default(&self) -> u64 {
        self.shutdown_grace_secs.unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS)
    }
}
