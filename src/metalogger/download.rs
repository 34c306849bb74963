//! Metadata image transfer: `DOWNLOAD_START(filenum) -> size`, then
//! repeated `DOWNLOAD_DATA(offset, len) -> (offset, len, crc32, bytes)`,
//! each chunk verified against its CRC before being accepted.
//!
//! Grounded in `mfsmetalogger/masterconn.c`'s `masterconn` download
//! state (`downloading`, `dloffset`, `filesize`), reproduced here as an
//! explicit state object rather than module-level fields.

use chunkstore_abi::crc::crc32;
use chunkstore_abi::message::{
    MATOML_DOWNLOAD_DATA, MATOML_DOWNLOAD_START, MLTOMA_DOWNLOAD_DATA, MLTOMA_DOWNLOAD_END,
    MLTOMA_DOWNLOAD_START,
};

use crate::error::WireError;
use crate::wire::argument::{ArgumentIterator, FieldWriter};
use crate::wire::envelope::Envelope;

/// Which on-disk image file is being downloaded (the metadata image
/// itself, or one of the session/changelog companion files the master
/// may also ship during a full resync).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNum {
    MetadataImage,
    Sessions,
}

impl FileNum {
    fn wire(self) -> u8 {
        match self {
            FileNum::MetadataImage => 1,
            FileNum::Sessions => 2,
        }
    }

    fn from_wire(v: u8) -> Option<FileNum> {
        match v {
            1 => Some(FileNum::MetadataImage),
            2 => Some(FileNum::Sessions),
            _ => None,
        }
    }
}

pub fn encode_download_start(file: FileNum) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.put_u8(file.wire());
    Envelope::encode_legacy(MLTOMA_DOWNLOAD_START, &w.into_bytes())
}

pub fn decode_download_start(payload: &[u8]) -> Result<FileNum, WireError> {
    let mut it = ArgumentIterator::new(payload);
    FileNum::from_wire(it.fetch_u8()?).ok_or(WireError::MalformedString)
}

/// Reply to `MLTOMA_DOWNLOAD_START`: total size of the file, or `u64::MAX`
/// meaning "no such file" (the original's sentinel for an image that
/// doesn't exist yet, e.g. a brand new master with no changelog history).
pub fn encode_download_start_reply(size: Option<u64>) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.put_u64(size.unwrap_or(u64::MAX));
    Envelope::encode_legacy(MATOML_DOWNLOAD_START, &w.into_bytes())
}

pub fn decode_download_start_reply(payload: &[u8]) -> Result<Option<u64>, WireError> {
    let mut it = ArgumentIterator::new(payload);
    let size = it.fetch_u64()?;
    Ok(if size == u64::MAX { None } else { Some(size) })
}

pub fn encode_download_data_request(offset: u64, len: u32) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.put_u64(offset);
    w.put_u32(len);
    Envelope::encode_legacy(MLTOMA_DOWNLOAD_DATA, &w.into_bytes())
}

pub fn decode_download_data_request(payload: &[u8]) -> Result<(u64, u32), WireError> {
    let mut it = ArgumentIterator::new(payload);
    Ok((it.fetch_u64()?, it.fetch_u32()?))
}

/// One verified chunk of the file, as delivered by `MATOML_DOWNLOAD_DATA`.
#[derive(Debug, Clone)]
pub struct DownloadedChunk {
    pub offset: u64,
    pub data: Vec<u8>,
}

pub fn encode_download_data_reply(offset: u64, data: &[u8]) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.put_u64(offset);
    w.put_u32(data.len() as u32);
    w.put_u32(crc32(data));
    w.put_bytes(data);
    Envelope::encode_legacy(MATOML_DOWNLOAD_DATA, &w.into_bytes())
}

/// Decode and CRC-verify one `MATOML_DOWNLOAD_DATA` reply. A mismatch is
/// reported rather than silently accepted, the same as a bad block CRC
/// on the client read path (spec.md §8 property 6).
pub fn decode_download_data_reply(payload: &[u8]) -> Result<DownloadedChunk, WireError> {
    let mut it = ArgumentIterator::new(payload);
    let offset = it.fetch_u64()?;
    let len = it.fetch_u32()? as usize;
    let crc = it.fetch_u32()?;
    let data = it.fetch_bytes(len)?.to_vec();
    if crc32(&data) != crc {
        return Err(WireError::MalformedString);
    }
    Ok(DownloadedChunk { offset, data })
}

pub fn encode_download_end() -> Vec<u8> {
    Envelope::encode_legacy(MLTOMA_DOWNLOAD_END, &[])
}

/// Chunk size requested per `DOWNLOAD_DATA` round, matching the
/// original's fixed transfer block.
pub const DOWNLOAD_CHUNK_SIZE: u32 = 1024 * 1024;

/// Drives one full download from the follower's side: issues
/// `DOWNLOAD_DATA` requests in order until `filesize` bytes have been
/// received, assembling them into one contiguous buffer.
#[derive(Debug)]
pub struct DownloadSession {
    file: FileNum,
    filesize: u64,
    received: Vec<u8>,
}

impl DownloadSession {
    pub fn new(file: FileNum, filesize: u64) -> DownloadSession {
        DownloadSession { file, filesize, received: Vec::with_capacity(filesize as usize) }
    }

    pub fn file(&self) -> FileNum {
        self.file
    }

    pub fn is_complete(&self) -> bool {
        self.received.len() as u64 >= self.filesize
    }

    /// Next `(offset, len)` to request, or `None` once complete.
    pub fn next_request(&self) -> Option<(u64, u32)> {
        if self.is_complete() {
            return None;
        }
        let offset = self.received.len() as u64;
        let remaining = self.filesize - offset;
        Some((offset, remaining.min(DOWNLOAD_CHUNK_SIZE as u64) as u32))
    }

    /// Fold in one verified chunk. The chunk must land exactly at the
    /// current write position; anything else is a protocol violation
    /// (the original's download loop is strictly sequential).
    pub fn accept(&mut self, chunk: DownloadedChunk) -> Result<(), WireError> {
        if chunk.offset != self.received.len() as u64 {
            return Err(WireError::MalformedString);
        }
        self.received.extend_from_slice(&chunk.data);
        Ok(())
    }

    /// Consume the session once complete, returning the assembled bytes.
    pub fn finish(self) -> Option<Vec<u8>> {
        self.is_complete().then_some(self.received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_start_roundtrips() {
        let packet = encode_download_start(FileNum::MetadataImage);
        let decoded = decode_download_start(&packet[8..]).unwrap();
        assert_eq!(decoded, FileNum::MetadataImage);
    }

    #[test]
    fn start_reply_none_means_missing_file() {
        let packet = encode_download_start_reply(None);
        assert_eq!(decode_download_start_reply(&packet[8..]).unwrap(), None);
    }

    #[test]
    fn data_reply_roundtrips_and_verifies_crc() {
        let data = b"metadata image bytes".to_vec();
        let packet = encode_download_data_reply(128, &data);
        let chunk = decode_download_data_reply(&packet[8..]).unwrap();
        assert_eq!(chunk.offset, 128);
        assert_eq!(chunk.data, data);
    }

    #[test]
    fn corrupted_data_reply_is_rejected() {
        let mut packet = encode_download_data_reply(0, b"hello world");
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert!(decode_download_data_reply(&packet[8..]).is_err());
    }

    #[test]
    fn session_assembles_sequential_chunks() {
        let mut session = DownloadSession::new(FileNum::MetadataImage, 10);
        assert_eq!(session.next_request(), Some((0, 10)));
        session.accept(DownloadedChunk { offset: 0, data: vec![1; 10] }).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.finish().unwrap(), vec![1; 10]);
    }

    #[test]
    fn out_of_order_chunk_is_rejected() {
        let mut session = DownloadSession::new(FileNum::MetadataImage, 20);
        let err = session.accept(DownloadedChunk { offset: 10, data: vec![0; 10] });
        assert!(err.is_err());
    }
}
