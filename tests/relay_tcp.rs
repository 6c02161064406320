//! End-to-end: TCP clients talk to the relay with newline-delimited JSON.

use huffchat::adapters::persistence::MemoryRepo;
use huffchat::adapters::transport::TcpGateway;
use huffchat::domain::{ClientEvent, ServerEvent};
use huffchat::ports::{ChatStore, RelayInbound};
use huffchat::usecases::{Inbox, LineBody, MessageComposer, RelayHandle, RelayService, RelaySettings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn next_event(&mut self) -> ServerEvent {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for server event")
            .unwrap()
            .expect("server closed connection");
        serde_json::from_str(&line).unwrap()
    }

    async fn send_raw(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    async fn send_bytes(&mut self, line: &[u8]) {
        self.writer.write_all(line).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn send(&mut self, event: &ClientEvent) {
        self.send_raw(&serde_json::to_string(event).unwrap()).await;
    }
}

async fn start_server(store: Arc<MemoryRepo>) -> SocketAddr {
    start_server_with(store, |gateway| gateway).await
}

async fn start_server_with(
    store: Arc<MemoryRepo>,
    configure: impl FnOnce(TcpGateway) -> TcpGateway,
) -> SocketAddr {
    let (handle, rx) = RelayHandle::channel(64);
    tokio::spawn(RelayService::new(store, RelaySettings::default(), rx).run());
    let inbound: Arc<dyn RelayInbound> = Arc::new(handle);
    let listener = TcpGateway::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::new(configure(TcpGateway::new(inbound))).serve(listener));
    addr
}

#[tokio::test]
async fn message_round_trip_between_two_clients() {
    let store = Arc::new(MemoryRepo::new());
    let addr = start_server(store.clone()).await;

    let mut alice = TestClient::connect(addr).await;
    let mut bob = TestClient::connect(addr).await;
    assert_eq!(alice.next_event().await, ServerEvent::History(vec![]));
    assert_eq!(bob.next_event().await, ServerEvent::History(vec![]));

    let outgoing = MessageComposer::new("Alice Smith")
        .compose("hello bob, how are you?")
        .unwrap();
    alice.send(&ClientEvent::Message(outgoing.clone())).await;

    let mut bob_inbox = Inbox::new();
    let received = bob.next_event().await;
    assert_eq!(received, ServerEvent::Message(outgoing.clone()));
    let added = bob_inbox.apply(received);
    assert_eq!(added[0].to_string(), "Alice Smith: hello bob, how are you?");

    // The sender gets its own message back through the relay.
    assert_eq!(alice.next_event().await, ServerEvent::Message(outgoing));

    let stored = store.recent(50).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "hello bob, how are you?");
}

#[tokio::test]
async fn late_joiner_receives_history() {
    let store = Arc::new(MemoryRepo::new());
    let addr = start_server(store.clone()).await;

    let mut alice = TestClient::connect(addr).await;
    alice.next_event().await;
    for text in ["first", "second"] {
        let msg = MessageComposer::new("alice").compose(text).unwrap();
        alice.send(&ClientEvent::Message(msg)).await;
        alice.next_event().await;
    }

    let mut carol = TestClient::connect(addr).await;
    let mut inbox = Inbox::new();
    inbox.apply(carol.next_event().await);
    let texts: Vec<&str> = inbox.lines().iter().filter_map(|l| l.text()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn malformed_lines_do_not_end_the_session() {
    let addr = start_server(Arc::new(MemoryRepo::new())).await;
    let mut alice = TestClient::connect(addr).await;
    alice.next_event().await;

    alice.send_raw("this is not json").await;
    alice.send_bytes(b"\xff\xfe not utf-8").await;
    alice
        .send_raw(r#"{"event":"message","data":{"codeTable":{"a":"0","b":"10"},"bitString":"11","sender":"alice"}}"#)
        .await;

    let mut inbox = Inbox::new();
    let event = alice.next_event().await;
    assert!(matches!(event, ServerEvent::Rejected { .. }));
    assert!(matches!(inbox.apply(event)[0].body, LineBody::Rejected { .. }));

    let msg = MessageComposer::new("alice").compose("still connected").unwrap();
    alice.send(&ClientEvent::Message(msg.clone())).await;
    assert_eq!(alice.next_event().await, ServerEvent::Message(msg));
}

#[tokio::test]
async fn oversized_lines_are_skipped() {
    let addr = start_server_with(Arc::new(MemoryRepo::new()), |g| g.with_max_line_bytes(512)).await;
    let mut alice = TestClient::connect(addr).await;
    alice.next_event().await;

    alice.send_raw(&"x".repeat(4096)).await;

    let msg = MessageComposer::new("alice").compose("short enough").unwrap();
    alice.send(&ClientEvent::Message(msg.clone())).await;
    assert_eq!(alice.next_event().await, ServerEvent::Message(msg));
}
