//! Cross-module integration tests exercising real async code paths
//! against loopback sockets, rather than mocking the connection type —
//! mirroring the teacher crate's own `tests/integration_tests.rs`
//! placement for tests that span more than one module.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use chunkstore::conn::connection::{Connection, Mode};
use chunkstore::conn::reactor::{self, PeerRole};
use chunkstore::error::WireError;
use chunkstore::geometry::{ChunkId, ChunkVersion, NetworkAddress};
use chunkstore::metalogger::follower::{ApplyOutcome, FollowerState};
use chunkstore::metalogger::stream::{serve_from_ring, StreamFrame, StreamSource};
use chunkstore::metalogger::ChangelogRing;
use chunkstore::registry::health;
use chunkstore::registry::ops::{ChunkRegistry, OpOutcome};
use chunkstore::wire::envelope::{Envelope, PacketSizeLimit};
use chunkstore_abi::header::{self, PacketHeader};

async fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = listener.accept();
    let connect = TcpStream::connect(addr);
    let (accepted, connected) = tokio::join!(accept, connect);
    (accepted.unwrap().0, connected.unwrap())
}

/// A packet written by a real client socket is framed and decoded by
/// [`Connection`]'s staged header/payload read exactly as
/// [`Envelope::encode_legacy`] produced it.
#[tokio::test]
async fn connection_decodes_a_real_socket_write() {
    let (server_stream, mut client_stream) = loopback_pair().await;

    let packet = Envelope::encode_legacy(110, b"hello-chunk");
    client_stream.write_all(&packet).await.unwrap();

    let mut conn = Connection::new(server_stream, Duration::from_secs(10), PacketSizeLimit::ChunkserverMaster);
    let header = conn.read_header().await.unwrap().expect("socket is still open");
    let payload = conn.read_payload().await.unwrap();
    let envelope = Envelope::decode(header, &payload).unwrap();

    assert_eq!(envelope.message_type, 110);
    assert_eq!(envelope.fields, b"hello-chunk");
}

/// A trivial [`PeerRole`] that never has anything to send and never
/// asks to close, used to drive the shared reactor loop against a real
/// socket purely to observe its keep-alive behavior.
struct IdleRole;

impl PeerRole for IdleRole {
    fn handle_message(
        &mut self,
        _conn: &mut Connection,
        _envelope: chunkstore::wire::envelope::Envelope,
    ) -> Result<(), WireError> {
        Ok(())
    }

    fn before_close(&mut self, _conn: &mut Connection) {}

    fn can_exit(&self) -> bool {
        true
    }
}

/// The shared reactor loop, given a real peer socket, sends a keep-alive
/// `ANTOAN_NOP` once the connection has been quiet past half its
/// timeout — and the remote side can read it straight off the wire.
#[tokio::test]
async fn reactor_emits_nop_on_idle_connection() {
    let (server_stream, mut client_stream) = loopback_pair().await;

    let conn = Connection::new(server_stream, Duration::from_millis(200), PacketSizeLimit::ChunkserverMaster);
    let role = IdleRole;

    let reactor = tokio::spawn(async move {
        tokio::time::timeout(Duration::from_secs(2), reactor::run(conn, role)).await.ok();
    });

    let mut header_buf = [0u8; header::HEADER_SIZE];
    tokio::time::timeout(Duration::from_secs(1), client_stream.read_exact(&mut header_buf))
        .await
        .expect("nop should arrive before the test timeout")
        .unwrap();
    let header = PacketHeader::from_bytes(&header_buf);
    assert_eq!(header.message_type(), chunkstore::wire::NOP_MESSAGE_TYPE);
    assert_eq!(header.payload_length(), 0);

    reactor.abort();
}

/// An oversize packet is rejected before its body is even read, and the
/// connection is killed rather than buffering it — spec.md §4.1.
#[tokio::test]
async fn oversize_packet_kills_the_connection() {
    let (server_stream, mut client_stream) = loopback_pair().await;

    let limit = PacketSizeLimit::MasterClient;
    let header = PacketHeader::new(400, limit.max_bytes() + 1);
    client_stream.write_all(&header.as_bytes()).await.unwrap();

    let mut conn = Connection::new(server_stream, Duration::from_secs(10), limit);
    let err = conn.read_header().await.unwrap_err();
    assert!(matches!(err, WireError::PacketTooLarge { .. }));
    conn.kill();
    assert_eq!(conn.mode(), Mode::Kill);
}

fn addr(n: u8) -> NetworkAddress {
    NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), 9422)
}

/// Property 7 (goal convergence): repeatedly replicating under-goal
/// chunks, with no further client writes, drives every chunk to exactly
/// its goal within a bounded number of health-loop iterations.
#[test]
fn health_loop_converges_every_chunk_to_its_goal() {
    let mut reg = ChunkRegistry::new();
    reg.begin_create(ChunkId(1), ChunkVersion(1), 3, &[addr(1)]).unwrap();
    reg.record_reply(ChunkId(1), addr(1), true);

    let (counters, classified) = health::scan(&reg);
    assert_eq!(counters.under_goal, 1);
    assert_eq!(classified, vec![(ChunkId(1), health::Classification::UnderGoal)]);

    let spare_servers = [addr(2), addr(3)];
    let mut iterations = 0;
    loop {
        let (counters, _) = health::scan(&reg);
        if counters.under_goal == 0 {
            break;
        }
        iterations += 1;
        assert!(iterations <= 4, "goal convergence should not take more rounds than spare servers");

        let destination = spare_servers[iterations - 1];
        reg.begin_replicate(ChunkId(1), ChunkVersion(1), destination).unwrap();
        let outcome = reg.record_reply(ChunkId(1), destination, true).unwrap();
        assert_eq!(outcome, OpOutcome::AllOk);
    }

    let (final_counters, _) = health::scan(&reg);
    assert_eq!(final_counters.stable, 1);
    assert_eq!(reg.get(ChunkId(1)).unwrap().valid_copy_count(), 3);
}

/// Property 8 (change-log continuity): a metalogger that falls behind
/// the in-memory retention window detects the gap rather than silently
/// skipping versions, and a resync against a fresh image re-anchors the
/// sequence so streaming can resume exactly where the image left off.
#[test]
fn metalogger_gap_forces_resync_not_silent_skip() {
    let mut ring = ChangelogRing::new(100, 600);
    let now = std::time::Instant::now();
    for v in 1..=3u64 {
        ring.push(v, format!("{v}: 0|ACCESS():0"), now);
    }

    let mut follower = FollowerState::new(Some(3));

    // The ring ages out everything, so a metalogger that reconnects
    // asking for version 4 can't be served from memory any longer.
    let later = now + Duration::from_secs(700);
    ring.push(4, "4: 0|ACCESS():0".to_string(), later);
    match serve_from_ring(&ring, follower.want_since_version()) {
        StreamSource::Disk { since } => assert_eq!(since, 4),
        StreamSource::Memory(_) => panic!("expected the old window to have aged out"),
    }

    // A frame arriving out of sequence (simulating the master having
    // moved on while the follower was detached) must be flagged, not
    // silently applied.
    let out_of_sequence = StreamFrame::Log { version: 9, line: "9: 0|APPEND():0".to_string() };
    assert_eq!(follower.apply(&out_of_sequence), ApplyOutcome::GapDetected { expected: 4, got: 9 });
    assert_eq!(follower.last_applied(), Some(3), "gap must not advance last_applied");

    // Resync: a fresh metadata image lands at version 9, re-anchoring.
    follower.reset_for_resync(9);
    assert_eq!(follower.want_since_version(), 10);
}
