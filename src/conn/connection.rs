//! Per-connection state: the staged `HEADER`→`DATA` read, output queue,
//! and liveness timestamps from spec.md §4.2.

use std::collections::VecDeque;
use std::time::Duration;

use chunkstore_abi::header::{self, PacketHeader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::WireError;
use crate::wire::envelope::PacketSizeLimit;

/// Where a connection is in its read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Waiting for the next 8-byte header.
    Header,
    /// Header read; waiting for `length` bytes of payload.
    Data,
    /// Torn down; the reactor should drop this connection after running
    /// `PeerRole::before_close`.
    Kill,
}

/// One TCP connection plus the bookkeeping the reactor needs to apply
/// spec.md §4.2's liveness rules.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    mode: Mode,
    pending_header: Option<PacketHeader>,
    out_queue: VecDeque<Vec<u8>>,
    last_read: Instant,
    last_write: Instant,
    pub timeout: Duration,
    pub size_limit: PacketSizeLimit,
}

impl Connection {
    pub fn new(stream: TcpStream, timeout: Duration, size_limit: PacketSizeLimit) -> Connection {
        let now = Instant::now();
        Connection {
            stream,
            mode: Mode::Header,
            pending_header: None,
            out_queue: VecDeque::new(),
            last_read: now,
            last_write: now,
            timeout,
            size_limit,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kill(&mut self) {
        self.mode = Mode::Kill;
    }

    /// Queue a fully-encoded packet (header + payload) for output.
    pub fn enqueue(&mut self, packet: Vec<u8>) {
        self.out_queue.push_back(packet);
    }

    pub fn has_pending_output(&self) -> bool {
        !self.out_queue.is_empty()
    }

    /// Read the next 8-byte header, transitioning to [`Mode::Data`] on
    /// success. Returns `Ok(None)` on clean EOF.
    pub async fn read_header(&mut self) -> Result<Option<PacketHeader>, WireError> {
        let mut buf = [0u8; header::HEADER_SIZE];
        let n = read_full_or_eof(&mut self.stream, &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if n < header::HEADER_SIZE {
            return Err(WireError::ShortHeader(n));
        }
        let header = PacketHeader::from_bytes(&buf);
        crate::wire::envelope::Envelope::check_size(header, self.size_limit)?;
        self.last_read = Instant::now();
        self.mode = Mode::Data;
        self.pending_header = Some(header);
        Ok(Some(header))
    }

    /// Read the payload announced by the most recent header, transitioning
    /// back to [`Mode::Header`].
    pub async fn read_payload(&mut self) -> Result<Vec<u8>, WireError> {
        let header = self.pending_header.take().expect("read_header must precede read_payload");
        let mut buf = vec![0u8; header.payload_length() as usize];
        let n = read_full_or_eof(&mut self.stream, &mut buf).await?;
        if n < buf.len() {
            return Err(WireError::ShortPayload { have: n, want: header.payload_length() });
        }
        self.last_read = Instant::now();
        self.mode = Mode::Header;
        Ok(buf)
    }

    /// Flush as much of the output queue as the socket will currently
    /// accept without blocking the reactor.
    pub async fn flush_output(&mut self) -> Result<(), WireError> {
        while let Some(packet) = self.out_queue.pop_front() {
            self.stream.write_all(&packet).await.map_err(|_| WireError::ShortPayload {
                have: 0,
                want: packet.len() as u32,
            })?;
            self.last_write = Instant::now();
        }
        Ok(())
    }

    pub fn should_kill(&self, now: Instant) -> bool {
        now.duration_since(self.last_read) > self.timeout
    }

    pub fn should_send_nop(&self, now: Instant) -> bool {
        !self.has_pending_output() && now.duration_since(self.last_write) > self.timeout / 2
    }

    pub fn note_nop_sent(&mut self) {
        self.last_write = Instant::now();
    }
}

async fn read_full_or_eof(
    stream: &mut TcpStream,
    buf: &mut [u8],
) -> Result<usize, WireError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream
            .read(&mut buf[filled..])
            .await
            .map_err(|_| WireError::ShortPayload { have: filled, want: buf.len() as u32 })?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
