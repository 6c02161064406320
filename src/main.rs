//! Wiring & DI. Entry point: bootstrap adapters, inject into the relay, serve TCP.
//! No business logic here; decoding and fan-out live in RelayService.

use dotenv::dotenv;
use huffchat::adapters::persistence::{MemoryRepo, SqliteRepo};
use huffchat::adapters::transport::TcpGateway;
use huffchat::ports::{ChatStore, RelayInbound};
use huffchat::shared::config::{AppConfig, DeliveryMode, StorageBackend};
use huffchat::usecases::{DeliveryPolicy, RelayHandle, RelayService, RelaySettings, RetryPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AppConfig::default()
    });

    // --- Chat store ---
    let retention = Duration::from_secs(cfg.retention_secs_or_default());
    let store: Arc<dyn ChatStore> = match cfg.storage_or_default() {
        StorageBackend::Sqlite => {
            let data_path = PathBuf::from(cfg.data_dir_or_default());
            Arc::new(
                SqliteRepo::connect(&data_path, retention)
                    .await
                    .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
            )
        }
        StorageBackend::Memory => {
            warn!("using in-memory chat store; history is lost on restart");
            Arc::new(MemoryRepo::with_retention(retention))
        }
    };

    // --- Retention sweep ---
    let purge_every = Duration::from_secs(cfg.purge_interval_secs_or_default());
    let sweeper_store = Arc::clone(&store);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper_store.purge_expired().await {
                warn!(error = %e, "retention sweep failed");
            }
        }
    });

    // --- Relay ---
    let delivery = match cfg.delivery_or_default() {
        DeliveryMode::PersistFirst => DeliveryPolicy::PersistFirst,
        DeliveryMode::Decoupled => DeliveryPolicy::Decoupled(RetryPolicy {
            attempts: cfg.persist_retry_attempts_or_default(),
            base_delay: Duration::from_millis(cfg.persist_retry_delay_ms_or_default()),
        }),
    };
    let settings = RelaySettings {
        history_limit: cfg.history_limit_or_default(),
        delivery,
    };
    let (handle, events_rx) = RelayHandle::channel(cfg.event_queue_size_or_default());
    let relay = RelayService::new(Arc::clone(&store), settings, events_rx);
    let relay_task = tokio::spawn(relay.run());

    // --- Transport ---
    let inbound: Arc<dyn RelayInbound> = Arc::new(handle.clone());
    let listener = TcpGateway::bind(&cfg.listen_addr_or_default())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let gateway =
        Arc::new(TcpGateway::new(inbound).with_max_line_bytes(cfg.max_line_bytes_or_default()));

    tokio::select! {
        _ = gateway.serve(listener) => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    // --- Shutdown: let queued appends reach the store ---
    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "relay already stopped");
    }
    drop(handle);
    let grace = Duration::from_secs(cfg.shutdown_grace_secs_or_default());
    match tokio::time::timeout(grace, relay_task).await {
        Ok(Ok(())) => info!("relay drained"),
        Ok(Err(e)) => warn!(error = %e, "relay task failed"),
        Err(_) => warn!(grace_secs = grace.as_secs(), "relay did not drain in time; pending appends lost"),
    }
    Ok(())
}
