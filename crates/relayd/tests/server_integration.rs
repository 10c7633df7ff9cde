//! Integration tests for the TCP relay server.
//!
//! These tests verify the server works correctly as a complete system:
//! join/left announcements, command dispatch, broadcast fan-out, idle kicks,
//! and shutdown. Each test binds an ephemeral port and talks the real
//! newline-delimited protocol over real sockets.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy covers
//! production code only.

use std::net::SocketAddr;
use std::time::Duration;

use relayd::registry::spawn_registry;
use relayd::relay::spawn_relay;
use relayd::server::RelayServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for a single expected line
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Window in which no output at all is expected
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Lines to scan before declaring an expected line missing
const MAX_SCAN_LINES: usize = 50;

/// Idle window used by the kick tests (kept long enough to be race-free,
/// short enough to keep the suite fast)
const SHORT_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Idle window used by tests that never want a kick
const LONG_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle and cleanup.
struct TestServer {
    addr: SocketAddr,
    cancel_token: CancellationToken,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_idle_timeout(LONG_IDLE_TIMEOUT).await
    }

    async fn spawn_with_idle_timeout(idle_timeout: Duration) -> Self {
        let registry = spawn_registry();
        let cancel_token = CancellationToken::new();

        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        spawn_relay(broadcast_rx, registry.clone(), cancel_token.clone());

        let server = RelayServer::bind(
            "127.0.0.1:0",
            registry,
            broadcast_tx,
            idle_timeout,
            cancel_token.clone(),
        )
        .await
        .expect("bind ephemeral port");
        let addr = server.local_addr().expect("local addr");

        // Spawn server in background
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer { addr, cancel_token }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        TestClient::new(stream)
    }

    fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// One connected protocol client.
struct TestClient {
    /// The address the server sees this client as (its default user name)
    addr: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let addr = stream.local_addr().expect("client local addr").to_string();
        let (read_half, write_half) = stream.into_split();
        TestClient {
            addr,
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write line");
        self.writer.write_all(b"\n").await.expect("write newline");
        self.writer.flush().await.expect("flush");
    }

    /// Receives the next line, panicking on timeout or EOF.
    async fn recv_line(&mut self) -> String {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("line within timeout")
            .expect("read line");
        assert!(n > 0, "unexpected EOF while waiting for a line");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Scans lines until one matches the predicate, panicking after
    /// [`MAX_SCAN_LINES`] non-matching lines.
    async fn recv_until(&mut self, pred: impl Fn(&str) -> bool) -> String {
        for _ in 0..MAX_SCAN_LINES {
            let line = self.recv_line().await;
            if pred(&line) {
                return line;
            }
        }
        panic!("expected line did not arrive within {MAX_SCAN_LINES} lines");
    }

    /// Asserts that the server sends nothing within [`SILENCE_WINDOW`].
    async fn assert_silent(&mut self) {
        let mut line = String::new();
        let result = timeout(SILENCE_WINDOW, self.reader.read_line(&mut line)).await;
        assert!(result.is_err(), "expected silence, got {line:?}");
    }

    /// Asserts that the server has closed the connection.
    async fn expect_eof(&mut self) {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("EOF within timeout")
            .expect("read at EOF");
        assert_eq!(n, 0, "expected EOF, got {line:?}");
    }
}

// ============================================================================
// Join / Left Announcements
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_join_is_announced_to_everyone_including_the_joiner() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    let alice_join = alice.recv_line().await;
    assert_eq!(alice_join, format!("{} joined", alice.addr));

    let mut bob = server.connect().await;
    let bob_join = bob.recv_line().await;
    assert_eq!(bob_join, format!("{} joined", bob.addr));

    // The earlier client sees the newcomer too
    let seen_by_alice = alice.recv_line().await;
    assert_eq!(seen_by_alice, format!("{} joined", bob.addr));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_is_announced_to_remaining_clients() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await; // own join

    let bob = server.connect().await;
    let bob_addr = bob.addr.clone();
    alice.recv_line().await; // bob joined
    drop(bob);

    let left = alice
        .recv_until(|line| line.ends_with(" left"))
        .await;
    assert_eq!(left, format!("{bob_addr} left"));
}

// ============================================================================
// who
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_who_lists_every_online_user_to_the_sender_only() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await; // bob joined

    alice.send_line("who").await;
    let first = alice.recv_line().await;
    let second = alice.recv_line().await;

    // Rows are 1-based indexed and cover both clients, in some order
    assert!(first.starts_with("1:"), "row was {first:?}");
    assert!(second.starts_with("2:"), "row was {second:?}");
    let rows = format!("{first}\n{second}");
    assert!(rows.contains(&format!("[{0}]{0}:online", alice.addr)));
    assert!(rows.contains(&format!("[{0}]{0}:online", bob.addr)));

    // Nothing leaks to the other client
    bob.assert_silent().await;
}

// ============================================================================
// rename
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_is_confirmed_and_reflected_in_who() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    alice.send_line("rename|Al").await;
    assert_eq!(alice.recv_line().await, "renamed to Al");

    alice.send_line("who").await;
    let row = alice.recv_line().await;
    assert_eq!(row, format!("1:[{}]Al:online", alice.addr));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_to_a_taken_name_is_rejected() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await;

    alice.send_line("rename|Al").await;
    assert_eq!(alice.recv_line().await, "renamed to Al");

    bob.send_line("rename|Al").await;
    assert_eq!(bob.recv_line().await, "name taken");

    // The loser keeps its old identity
    bob.send_line("who").await;
    let rows = format!("{}\n{}", bob.recv_line().await, bob.recv_line().await);
    assert!(rows.contains(&format!("[{0}]{0}:online", bob.addr)));
}

// ============================================================================
// Direct Messages
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_direct_message_reaches_only_the_target() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await;

    alice.send_line("rename|Al").await;
    assert_eq!(alice.recv_line().await, "renamed to Al");
    bob.send_line("rename|Bee").await;
    assert_eq!(bob.recv_line().await, "renamed to Bee");

    bob.send_line("to|Al|hi").await;

    assert_eq!(alice.recv_line().await, "Bee says: hi");
    // No echo and no broadcast copy for the sender
    bob.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_direct_message_to_unknown_user_reports_no_such_user() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    alice.send_line("to|Ghost|hello").await;
    assert_eq!(alice.recv_line().await, "no such user");
    alice.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_direct_message_to_unknown_target_reports_no_such_user() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    // The target is resolved before the body is inspected
    alice.send_line("to|Ghost|").await;
    assert_eq!(alice.recv_line().await, "no such user");
    alice.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_direct_message_to_online_target_is_rejected() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await;

    bob.send_line("rename|Bee").await;
    assert_eq!(bob.recv_line().await, "renamed to Bee");

    alice.send_line("to|Bee|").await;
    assert_eq!(alice.recv_line().await, "empty message");

    // Nothing reached the target
    bob.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_to_without_message_segment_is_malformed() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    alice.send_line("to|bob").await;
    assert_eq!(
        alice.recv_line().await,
        "malformed command: expected to|<name>|<message>"
    );
}

// ============================================================================
// Broadcast Chat
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_line_is_broadcast_to_everyone_including_the_sender() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await;

    alice.send_line("hello everyone").await;

    let expected = format!("[{0}]{0}: hello everyone", alice.addr);
    assert_eq!(alice.recv_line().await, expected);
    assert_eq!(bob.recv_line().await, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blank_lines_are_ignored() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    alice.send_line("").await;
    alice.assert_silent().await;
}

// ============================================================================
// Idle Kicks
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_silent_client_is_warned_kicked_and_announced_as_left() {
    let server = TestServer::spawn_with_idle_timeout(SHORT_IDLE_TIMEOUT).await;

    let mut alice = server.connect().await;
    alice.recv_line().await;
    let mut bob = server.connect().await;
    bob.recv_line().await;
    alice.recv_line().await;
    let alice_addr = alice.addr.clone();

    // Keep bob alive past alice's deadline; alice stays silent
    for _ in 0..8 {
        bob.send_line("ping").await;
        sleep(Duration::from_millis(100)).await;
    }

    // Alice sees bob's chatter, then the warning, then the server hangs up
    alice
        .recv_until(|line| line == "kicked for inactivity")
        .await;
    alice.expect_eof().await;

    // The survivor sees the departure
    let left = bob.recv_until(|line| line.ends_with(" left")).await;
    assert_eq!(left, format!("{alice_addr} left"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_active_client_is_not_kicked() {
    let server = TestServer::spawn_with_idle_timeout(SHORT_IDLE_TIMEOUT).await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    // Each command lands well inside the idle window and re-arms it
    for _ in 0..4 {
        sleep(Duration::from_millis(300)).await;
        alice.send_line("who").await;
        let row = alice.recv_line().await;
        assert!(row.ends_with(":online"), "row was {row:?}");
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_newcomer_colliding_with_a_renamed_user_is_told_and_dropped() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    // Bind the newcomer's socket first so its address is known, then let
    // alice squat on that exact string as a display name.
    let socket = TcpSocket::new_v4().expect("create socket");
    socket
        .bind("127.0.0.1:0".parse().expect("parse bind addr"))
        .expect("bind client socket");
    let squatted = socket.local_addr().expect("client local addr");

    alice.send_line(&format!("rename|{squatted}")).await;
    assert_eq!(alice.recv_line().await, format!("renamed to {squatted}"));

    let stream = socket.connect(server.addr).await.expect("connect");
    let mut bob = TestClient::new(stream);

    // The newcomer hears why before the server hangs up
    assert_eq!(bob.recv_line().await, "name taken");
    bob.expect_eof().await;

    // No join was ever announced for it
    alice.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_keeps_serving_after_a_client_disconnects() {
    let server = TestServer::spawn().await;

    let alice = server.connect().await;
    drop(alice);

    // Give the disconnect a moment to unwind
    sleep(Duration::from_millis(100)).await;

    let mut bob = server.connect().await;
    bob.recv_line().await;
    bob.send_line("who").await;
    let row = bob.recv_line().await;
    assert_eq!(row, format!("1:[{0}]{0}:online", bob.addr));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_closes_connected_clients() {
    let server = TestServer::spawn().await;

    let mut alice = server.connect().await;
    alice.recv_line().await;

    server.shutdown();
    alice.expect_eof().await;
}
