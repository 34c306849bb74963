//! Streams numbered changelog entries to a registered metalogger:
//! serves what's still in [`ChangelogRing`] memory, falling back to
//! on-disk `changelog.N.mfs` files, chunked to at most
//! [`MAX_LINES_PER_CALL`] lines per call per spec.md §4.7.

use chunkstore_abi::message::{
    MATOML_METACHANGES_LOG, METACHANGES_LOG_DATA_TAG, METACHANGES_LOG_ROTATE_TAG,
};

use crate::error::WireError;
use crate::metalogger::changelog::ChangelogRing;
use crate::wire::argument::{ArgumentIterator, FieldWriter};
use crate::wire::envelope::Envelope;

/// `MATOML_METACHANGES_LOG` frames back-pressured by output-queue
/// emptiness never exceed this many lines per call.
pub const MAX_LINES_PER_CALL: usize = 50_000;

/// One decoded `MATOML_METACHANGES_LOG` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// One numbered log line.
    Log { version: u64, line: String },
    /// The master rotated its changelog file; the follower should close
    /// and rename its own local ring.
    Rotate,
}

impl StreamFrame {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = FieldWriter::new();
        match self {
            StreamFrame::Log { version, line } => {
                w.put_u8(METACHANGES_LOG_DATA_TAG);
                w.put_u64(*version);
                w.put_bytes(line.as_bytes());
            }
            StreamFrame::Rotate => {
                w.put_u8(METACHANGES_LOG_ROTATE_TAG);
            }
        }
        Envelope::encode_legacy(MATOML_METACHANGES_LOG, &w.into_bytes())
    }

    pub fn decode(payload: &[u8]) -> Result<StreamFrame, WireError> {
        let mut it = ArgumentIterator::new(payload);
        match it.fetch_u8()? {
            METACHANGES_LOG_DATA_TAG => {
                let version = it.fetch_u64()?;
                let line = String::from_utf8_lossy(it.fetch_all()).into_owned();
                Ok(StreamFrame::Log { version, line })
            }
            METACHANGES_LOG_ROTATE_TAG => Ok(StreamFrame::Rotate),
            _ => Err(WireError::MalformedString),
        }
    }
}

/// Where a changelog request was actually satisfied from, so the caller
/// can decide whether to keep polling memory or hand the request to the
/// on-disk reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    Memory(Vec<StreamFrame>),
    /// The in-memory ring no longer covers `since`; the caller must open
    /// `changelog.N.mfs` files in decreasing `N` and seek to the first
    /// line whose version is `>= since`.
    Disk { since: u64 },
}

/// Satisfy a metalogger's `want_since_version` request against the
/// in-memory ring, capped to [`MAX_LINES_PER_CALL`] entries.
pub fn serve_from_ring(ring: &ChangelogRing, since: u64) -> StreamSource {
    match ring.entries_since(since) {
        Some(entries) => StreamSource::Memory(
            entries
                .into_iter()
                .take(MAX_LINES_PER_CALL)
                .map(|e| StreamFrame::Log { version: e.version, line: e.line.clone() })
                .collect(),
        ),
        None => StreamSource::Disk { since },
    }
}

/// A source of on-disk changelog lines, seeked to the first line with
/// `version >= since`. The on-disk file format itself (line text,
/// rotation naming) is config/deployment-layout concern kept behind
/// this trait rather than hard-coded here.
pub trait DiskChangelogReader {
    /// Read up to `max_lines` lines starting at `since`, in ascending
    /// version order. Returns fewer than `max_lines` only when no more
    /// remain on disk.
    fn read_since(&mut self, since: u64, max_lines: usize) -> std::io::Result<Vec<(u64, String)>>;
}

/// Drain a disk reader into frames, capped to [`MAX_LINES_PER_CALL`].
pub fn serve_from_disk(
    reader: &mut dyn DiskChangelogReader,
    since: u64,
) -> std::io::Result<Vec<StreamFrame>> {
    let lines = reader.read_since(since, MAX_LINES_PER_CALL)?;
    Ok(lines.into_iter().map(|(version, line)| StreamFrame::Log { version, line }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn log_frame_roundtrips() {
        let frame = StreamFrame::Log { version: 42, line: "42: 0|ACCESS():0".to_string() };
        let packet = frame.encode();
        let header = chunkstore_abi::header::PacketHeader::from_bytes(packet[..8].try_into().unwrap());
        assert_eq!(header.message_type(), MATOML_METACHANGES_LOG);
        let decoded = StreamFrame::decode(&packet[8..]).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rotate_frame_roundtrips() {
        let packet = StreamFrame::Rotate.encode();
        let decoded = StreamFrame::decode(&packet[8..]).unwrap();
        assert_eq!(decoded, StreamFrame::Rotate);
    }

    #[test]
    fn serve_from_ring_falls_back_to_disk_when_too_old() {
        let mut ring = ChangelogRing::new(100, 600);
        ring.push(10, "10: 0|ACCESS():0".to_string(), Instant::now());
        assert_eq!(serve_from_ring(&ring, 1), StreamSource::Disk { since: 1 });
    }

    #[test]
    fn serve_from_ring_returns_memory_entries_when_covered() {
        let mut ring = ChangelogRing::new(100, 600);
        let now = Instant::now();
        ring.push(10, "10: 0|ACCESS():0".to_string(), now);
        ring.push(11, "11: 0|APPEND():0".to_string(), now);
        match serve_from_ring(&ring, 10) {
            StreamSource::Memory(frames) => assert_eq!(frames.len(), 2),
            StreamSource::Disk { .. } => panic!("expected memory source"),
        }
    }
}
