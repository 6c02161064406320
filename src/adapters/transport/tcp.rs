//! Newline-delimited JSON over TCP. Drives the relay through RelayInbound.
//!
//! One JSON event per line in both directions:
//! `{"event":"message","data":{"codeTable":{..},"bitString":"..","sender":".."}}`.
//! Each connection gets a writer task draining its outbox; the reader loop
//! forwards parsed events to the relay. Lines longer than the configured cap,
//! not valid UTF-8, or not a known event are logged and skipped.

use crate::domain::{ClientEvent, ClientId, DomainError, ServerEvent};
use crate::ports::RelayInbound;
use crate::shared::config::DEFAULT_MAX_LINE_BYTES;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// TCP front door for the relay.
pub struct TcpGateway {
    relay: Arc<dyn RelayInbound>,
    next_id: AtomicU64,
    max_line_bytes: usize,
}

/// Outcome of reading one newline-terminated frame.
enum Frame {
    Line,
    TooLong,
    Eof,
}

impl TcpGateway {
    pub fn new(relay: Arc<dyn RelayInbound>) -> Self {
        Self {
            relay,
            next_id: AtomicU64::new(1),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max.max(1);
        self
    }

    pub async fn bind(addr: &str) -> Result<TcpListener, DomainError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DomainError::Transport(format!("bind {}: {}", addr, e)))?;
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, "TCP listener bound");
        }
        Ok(listener)
    }

    /// Accept connections forever, one task per client.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, remote)) => {
                    let gateway = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = gateway.handle_connection(stream, remote).await {
                            warn!(remote = %remote, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        remote: SocketAddr,
    ) -> Result<(), DomainError> {
        let client = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(client = %client, remote = %remote, "client connected");

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
        let writer = tokio::spawn(write_events(client, write_half, rx));

        self.relay.connect(client, Arc::new(tx)).await?;
        let result = self.read_events(client, read_half).await;
        self.relay.disconnect(client).await?;

        // The relay dropped our outbox on disconnect, so the writer drains and exits.
        if let Err(e) = writer.await {
            debug!(client = %client, error = %e, "writer task aborted");
        }
        info!(client = %client, "client disconnected");
        result
    }

    async fn read_events(&self, client: ClientId, read_half: OwnedReadHalf) -> Result<(), DomainError> {
        let mut reader = BufReader::new(read_half);
        let mut buf = Vec::new();
        loop {
            match read_frame(&mut reader, &mut buf, self.max_line_bytes).await? {
                Frame::Eof => return Ok(()),
                Frame::TooLong => {
                    warn!(client = %client, limit = self.max_line_bytes, "skipping oversized line");
                    continue;
                }
                Frame::Line => {}
            }
            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<ClientEvent>(line) {
                Ok(ClientEvent::Message(message)) => self.relay.submit(client, message).await?,
                Err(e) => warn!(client = %client, error = %e, "skipping malformed event"),
            }
        }
    }
}

/// Read one line into `buf` without buffering more than `max + 1` bytes of it.
/// An oversized line is consumed up to its newline and reported as `TooLong`.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> Result<Frame, DomainError>
where
    R: AsyncBufRead + Unpin,
{
    let io_err = |e: std::io::Error| DomainError::Transport(e.to_string());
    let limit = max as u64 + 1;

    buf.clear();
    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', buf)
        .await
        .map_err(io_err)?;
    if n == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') || buf.len() <= max {
        return Ok(Frame::Line);
    }

    // Discard the rest of the oversized line in bounded chunks.
    loop {
        buf.clear();
        let n = (&mut *reader)
            .take(limit)
            .read_until(b'\n', buf)
            .await
            .map_err(io_err)?;
        if n == 0 || buf.last() == Some(&b'\n') {
            buf.clear();
            return Ok(Frame::TooLong);
        }
    }
}

async fn write_events(
    client: ClientId,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let mut line = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!(client = %client, error = %e, "failed to serialize event");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!(client = %client, error = %e, "client socket closed");
            break;
        }
    }
}
