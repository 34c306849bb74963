//! Decoding and encoding of complete packets (header + payload), with the
//! legacy/versioned split and the per-peer-pair size ceiling from spec.md
//! §4.1.

use chunkstore_abi::header::{self, PacketHeader};

use crate::error::WireError;

/// Which peer pair a connection is between, selecting the applicable
/// maximum packet size. Oversize packets are a hard disconnect either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSizeLimit {
    ChunkserverMaster,
    ChunkserverChunkserver,
    MasterMetalogger,
    MasterClient,
}

impl PacketSizeLimit {
    pub fn max_bytes(self) -> u32 {
        match self {
            PacketSizeLimit::ChunkserverMaster => header::MAX_PACKET_SIZE_CS_MASTER,
            PacketSizeLimit::ChunkserverChunkserver => header::MAX_PACKET_SIZE_CS_CS,
            PacketSizeLimit::MasterMetalogger => header::MAX_PACKET_SIZE_MASTER_METALOGGER,
            PacketSizeLimit::MasterClient => header::MAX_PACKET_SIZE_MASTER_CLIENT,
        }
    }
}

/// A decoded packet: its message type plus the fields portion of the
/// payload (the `version:u32` prefix of a versioned packet has already
/// been stripped and returned separately).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message_type: u32,
    pub version: Option<u32>,
    pub fields: Vec<u8>,
}

impl Envelope {
    /// Decode one complete packet's worth of bytes, given the header that
    /// was already read off the stream separately (per the two-stage
    /// `HEADER`→`DATA` read in spec.md §4.2).
    pub fn decode(header: PacketHeader, payload: &[u8]) -> Result<Envelope, WireError> {
        if payload.len() as u64 != header.payload_length() as u64 {
            return Err(WireError::ShortPayload {
                have: payload.len(),
                want: header.payload_length(),
            });
        }
        if header.is_versioned() {
            if payload.len() < 4 {
                return Err(WireError::MissingVersion);
            }
            let version = u32::from_be_bytes(payload[0..4].try_into().unwrap());
            Ok(Envelope {
                message_type: header.message_type(),
                version: Some(version),
                fields: payload[4..].to_vec(),
            })
        } else {
            Ok(Envelope {
                message_type: header.message_type(),
                version: None,
                fields: payload.to_vec(),
            })
        }
    }

    /// Check an announced payload length against `limit` before the body
    /// is even read, so an oversize packet can be rejected without
    /// buffering it.
    pub fn check_size(header: PacketHeader, limit: PacketSizeLimit) -> Result<(), WireError> {
        let max = limit.max_bytes();
        if header.payload_length() > max {
            Err(WireError::PacketTooLarge { announced: header.payload_length(), limit: max })
        } else {
            Ok(())
        }
    }

    /// Encode a legacy (unversioned) packet.
    pub fn encode_legacy(message_type: u32, fields: &[u8]) -> Vec<u8> {
        Envelope::encode(message_type, None, fields)
    }

    /// Encode a versioned packet.
    pub fn encode_versioned(message_type: u32, version: u32, fields: &[u8]) -> Vec<u8> {
        Envelope::encode(message_type, Some(version), fields)
    }

    fn encode(message_type: u32, version: Option<u32>, fields: &[u8]) -> Vec<u8> {
        let version_bytes = version.map(u32::to_be_bytes);
        let payload_len = version_bytes.map_or(0, |_| 4) + fields.len();
        let header = PacketHeader::new(message_type, payload_len as u32);

        let mut out = Vec::with_capacity(header::HEADER_SIZE + payload_len);
        out.extend_from_slice(&header.as_bytes());
        if let Some(v) = version_bytes {
            out.extend_from_slice(&v);
        }
        out.extend_from_slice(fields);
        out
    }
}
