//! Wire-level error taxonomy.
//!
//! A single `u8` status code travels on the wire; `0` means success. The
//! numeric values match the protocol's `ERROR_*` table so that error bytes
//! are interchangeable between implementations; the variant names favor
//! the POSIX errno they ultimately surface as, per spec.md's §7 renaming
//! of the legacy `ERROR_BADID`/`ERROR_NOTFILE`/… codes.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    Ok = 0,
    EPerm = 1,
    ENotDir = 2,
    ENoEnt = 3,
    EAccess = 4,
    EExist = 5,
    EInval = 6,
    ENotEmpty = 7,
    ChunkLost = 8,
    OutOfMemory = 9,
    IndexTooBig = 10,
    Locked = 11,
    NoChunkServers = 12,
    NoChunk = 13,
    ChunkBusy = 14,
    Register = 15,
    NotDone = 16,
    NotOpened = 17,
    NotStarted = 18,
    WrongVersion = 19,
    ChunkExist = 20,
    NoSpace = 21,
    Io = 22,
    BNumTooBig = 23,
    WrongSize = 24,
    WrongOffset = 25,
    CantConnect = 26,
    WrongChunkId = 27,
    Disconnected = 28,
    Crc = 29,
    Delayed = 30,
    CantCreatePath = 31,
    Mismatch = 32,
}

impl ErrorCode {
    pub fn is_ok(self) -> bool {
        matches!(self, ErrorCode::Ok)
    }

    /// Whether spec.md §7 classifies this as transient master/CS contention
    /// that should be retried after a short sleep.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCode::Locked | ErrorCode::ChunkBusy | ErrorCode::Delayed)
    }

    /// Whether this is a protocol/data integrity failure that should kill
    /// the connection and force a replan rather than a blind retry.
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            ErrorCode::Crc
                | ErrorCode::WrongSize
                | ErrorCode::WrongOffset
                | ErrorCode::BNumTooBig
                | ErrorCode::WrongChunkId
                | ErrorCode::WrongVersion
        )
    }

    /// Whether this is a cluster-wide write failure that should back off
    /// for a long interval (~60s per spec.md §7) before retrying.
    pub fn is_cluster_exhausted(self) -> bool {
        matches!(self, ErrorCode::NoChunkServers | ErrorCode::NoSpace)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_zero() {
        assert_eq!(u8::from(ErrorCode::Ok), 0);
    }

    #[test]
    fn roundtrips_through_u8() {
        for raw in 0..=32u8 {
            let code = ErrorCode::try_from(raw).expect("all codes 0..=32 are defined");
            assert_eq!(u8::from(code), raw);
        }
    }

    #[test]
    fn classification_is_disjoint_for_named_groups() {
        assert!(ErrorCode::Locked.is_transient());
        assert!(!ErrorCode::Locked.is_integrity_failure());
        assert!(ErrorCode::Crc.is_integrity_failure());
        assert!(!ErrorCode::Crc.is_transient());
        assert!(ErrorCode::NoSpace.is_cluster_exhausted());
    }
}
