//! Packet envelope: `type:u32 | length:u32 | payload[length]`, network byte order.
//!
//! Two envelope flavors share the same 8-byte header. A "legacy" packet's
//! payload begins immediately with message fields; a "versioned" packet's
//! payload begins with a `version:u32` before the fields. Which flavor a
//! `type` belongs to is determined purely by its numeric range.

use zerocopy::byteorder::network_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size in bytes of the on-wire header (`type` + `length`).
pub const HEADER_SIZE: usize = 8;

/// Legacy packet types occupy `[MIN_OLD_TYPE, MAX_OLD_TYPE]`.
pub const MIN_OLD_TYPE: u32 = 0;
pub const MAX_OLD_TYPE: u32 = 1000;

/// Versioned packet types occupy `[MIN_NEW_TYPE, MAX_NEW_TYPE]`.
pub const MIN_NEW_TYPE: u32 = 1001;
pub const MAX_NEW_TYPE: u32 = 2000;

/// Maximum packet payload size per peer-pair, per spec: oversize is a hard disconnect.
pub const MAX_PACKET_SIZE_CS_MASTER: u32 = 50 * 1024 * 1024;
pub const MAX_PACKET_SIZE_CS_CS: u32 = 1_500_000;
pub const MAX_PACKET_SIZE_MASTER_METALOGGER: u32 = 1_500_000;
pub const MAX_PACKET_SIZE_MASTER_CLIENT: u32 = 1024 * 1024;

/// The 8-byte header shared by every packet on every connection.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PacketHeader {
    ty: U32,
    length: U32,
}

impl PacketHeader {
    pub fn new(ty: u32, length: u32) -> Self {
        PacketHeader {
            ty: U32::new(ty),
            length: U32::new(length),
        }
    }

    pub fn message_type(&self) -> u32 {
        self.ty.get()
    }

    /// Length, in bytes, of everything following the header (version field
    /// included, for versioned packets).
    pub fn payload_length(&self) -> u32 {
        self.length.get()
    }

    pub fn is_versioned(&self) -> bool {
        (MIN_NEW_TYPE..=MAX_NEW_TYPE).contains(&self.ty.get())
    }

    pub fn is_legacy(&self) -> bool {
        self.ty.get() <= MAX_OLD_TYPE
    }

    pub fn as_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.ty.get().to_be_bytes());
        out[4..8].copy_from_slice(&self.length.get().to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let ty = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let length = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        PacketHeader::new(ty, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let h = PacketHeader::new(200, 42);
        let bytes = h.as_bytes();
        let h2 = PacketHeader::from_bytes(&bytes);
        assert_eq!(h, h2);
        assert_eq!(h2.message_type(), 200);
        assert_eq!(h2.payload_length(), 42);
    }

    #[test]
    fn flavor_ranges() {
        assert!(PacketHeader::new(110, 0).is_legacy());
        assert!(!PacketHeader::new(110, 0).is_versioned());
        assert!(PacketHeader::new(1500, 0).is_versioned());
        assert!(!PacketHeader::new(1500, 0).is_legacy());
    }
}
