//! Fixed-size attribute record and the constants that describe it.

use zerocopy::byteorder::network_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size in bytes of the on-wire attribute record.
pub const ATTR_RECORD_SIZE: usize = 35;

/// `type:u8 mode:u16 uid:u32 gid:u32 atime:u32 mtime:u32 ctime:u32 nlink:u32 length:u64`.
///
/// Every field is a zerocopy byteorder wrapper with 1-byte alignment, so
/// the struct is packed with no inserted padding: `1 + 2 + 4*6 + 8 = 35`
/// bytes, matching `ATTR_RECORD_SIZE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct AttrRecordRaw {
    file_type: u8,
    mode: U16,
    uid: U32,
    gid: U32,
    atime: U32,
    mtime: U32,
    ctime: U32,
    nlink: U32,
    length: U64,
}

/// Ergonomic, host-endian view of [`AttrRecordRaw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrRecord {
    pub file_type: FileType,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    pub nlink: u32,
    /// File length, or block device major/minor packed in for `Block`/`Char`.
    pub length: u64,
}

impl AttrRecord {
    pub fn to_raw(self) -> AttrRecordRaw {
        AttrRecordRaw {
            file_type: self.file_type as u8,
            mode: U16::new(self.mode),
            uid: U32::new(self.uid),
            gid: U32::new(self.gid),
            atime: U32::new(self.atime),
            mtime: U32::new(self.mtime),
            ctime: U32::new(self.ctime),
            nlink: U32::new(self.nlink),
            length: U64::new(self.length),
        }
    }

    pub fn from_raw(raw: &AttrRecordRaw) -> Option<AttrRecord> {
        Some(AttrRecord {
            file_type: FileType::from_sentinel(raw.file_type)?,
            mode: raw.mode.get(),
            uid: raw.uid.get(),
            gid: raw.gid.get(),
            atime: raw.atime.get(),
            mtime: raw.mtime.get(),
            ctime: raw.ctime.get(),
            nlink: raw.nlink.get(),
            length: raw.length.get(),
        })
    }
}

/// Single-byte file type sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    File = b'f',
    Dir = b'd',
    Symlink = b'l',
    Fifo = b'q',
    BlockDev = b'b',
    CharDev = b'c',
    Socket = b's',
    Trash = b't',
    Reserved = b'r',
}

impl FileType {
    pub fn from_sentinel(byte: u8) -> Option<FileType> {
        Some(match byte {
            b'f' => FileType::File,
            b'd' => FileType::Dir,
            b'l' => FileType::Symlink,
            b'q' => FileType::Fifo,
            b'b' => FileType::BlockDev,
            b'c' => FileType::CharDev,
            b's' => FileType::Socket,
            b't' => FileType::Trash,
            b'r' => FileType::Reserved,
            _ => return None,
        })
    }
}

/// `setmask` bits accepted on the new `SETATTR` path. Legacy
/// `GOAL`/`LENGTH`/`OPENED`/`DELETE` bits are rejected with `EINVAL`.
pub mod setmask {
    pub const MODE: u32 = 0x0002;
    pub const UID: u32 = 0x0004;
    pub const GID: u32 = 0x0008;
    pub const MTIME: u32 = 0x0020;
    pub const ATIME: u32 = 0x0040;

    /// Legacy bits that must be rejected with `EINVAL` on the new path.
    pub const LEGACY_REJECTED: u32 = 0x0001 | 0x0010 | 0x0080 | 0x0100;
}

/// Extra attribute bits (4 total).
pub mod extra_attr {
    pub const NOOWNER: u8 = 0x01;
    pub const NOACACHE: u8 = 0x02;
    pub const NOECACHE: u8 = 0x04;
    pub const NODATACACHE: u8 = 0x08;
}

/// Session registration flags (`SESFLAG_*`).
pub mod session_flags {
    pub const READONLY: u8 = 0x01;
    pub const DYNAMICIP: u8 = 0x02;
    pub const IGNOREGID: u8 = 0x04;
    pub const CANCHANGEQUOTA: u8 = 0x08;
    pub const MAPALL: u8 = 0x10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_35_bytes() {
        assert_eq!(std::mem::size_of::<AttrRecordRaw>(), ATTR_RECORD_SIZE);
    }

    #[test]
    fn roundtrip() {
        let attr = AttrRecord {
            file_type: FileType::File,
            mode: 0o644,
            uid: 1000,
            gid: 1000,
            atime: 1,
            mtime: 2,
            ctime: 3,
            nlink: 1,
            length: 65536,
        };
        let raw = attr.to_raw();
        let back = AttrRecord::from_raw(&raw).unwrap();
        assert_eq!(attr, back);
    }

    #[test]
    fn unknown_sentinel_rejected() {
        assert!(FileType::from_sentinel(b'?').is_none());
    }
}
