//! Subsystem error types.
//!
//! Wire-level status bytes live in [`chunkstore_abi::ErrorCode`]; these
//! types wrap them with the context each subsystem needs to decide
//! retry/kill-connection/surface-to-caller, following spec.md §7's
//! propagation rules. Kept as plain `std::error::Error` impls (manual
//! `Display`, no `thiserror`) the way the teacher crate's
//! `RequestError` is written.

use std::{error, fmt};

pub use chunkstore_abi::ErrorCode;

/// Error parsing a packet envelope off the wire.
#[derive(Debug)]
pub enum WireError {
    /// Fewer than 8 bytes were available for the header.
    ShortHeader(usize),
    /// The header announced more payload than the peer's configured limit.
    PacketTooLarge { announced: u32, limit: u32 },
    /// The payload was shorter than the header promised (a truncated read).
    ShortPayload { have: usize, want: u32 },
    /// A versioned packet didn't even have room for its `version:u32`.
    MissingVersion,
    /// Ran out of bytes decoding a fixed-width argument.
    InsufficientData,
    /// A length-prefixed name/path had no data, or a NUL-terminated one
    /// was missing its terminator.
    MalformedString,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::ShortHeader(len) => {
                write!(f, "short read of packet header ({len} < 8)")
            }
            WireError::PacketTooLarge { announced, limit } => {
                write!(f, "packet of {announced} bytes exceeds limit of {limit} bytes")
            }
            WireError::ShortPayload { have, want } => {
                write!(f, "short read of packet payload ({have} < {want})")
            }
            WireError::MissingVersion => write!(f, "versioned packet missing version field"),
            WireError::InsufficientData => write!(f, "insufficient argument data"),
            WireError::MalformedString => write!(f, "malformed length-prefixed string"),
        }
    }
}

impl error::Error for WireError {}

/// Outcome of asking the master to locate a chunk, classified per spec.md
/// §4.4: `ENOENT` ends the read outright, anything else is worth a retry.
#[derive(Debug, Clone, Copy)]
pub enum LocateError {
    /// The file/chunk index genuinely doesn't exist; do not retry.
    Unrecoverable(ErrorCode),
    /// Transient master-side condition; retry with backoff.
    Recoverable(ErrorCode),
}

impl LocateError {
    pub fn classify(code: ErrorCode) -> LocateError {
        if matches!(code, ErrorCode::ENoEnt) {
            LocateError::Unrecoverable(code)
        } else {
            LocateError::Recoverable(code)
        }
    }

    pub fn code(self) -> ErrorCode {
        match self {
            LocateError::Unrecoverable(c) | LocateError::Recoverable(c) => c,
        }
    }
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::Unrecoverable(c) => write!(f, "unrecoverable locate failure: {c}"),
            LocateError::Recoverable(c) => write!(f, "recoverable locate failure: {c}"),
        }
    }
}

impl error::Error for LocateError {}

/// Failure planning or executing a read.
#[derive(Debug)]
pub enum ReadError {
    /// No complete replica or XOR scheme could be assembled from the
    /// advertised locations (spec.md §4.4 preference-order step 4).
    ChunkLost,
    /// A chunk server connection failed or returned a non-OK status.
    Server { address: String, code: Option<ErrorCode> },
    /// A received block's CRC didn't match its payload.
    CrcMismatch,
    /// Blocks arrived out of the required ascending `(blocknum, offset)` order.
    OutOfOrderBlocks,
    Wire(WireError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::ChunkLost => write!(f, "no complete replica or xor scheme available"),
            ReadError::Server { address, code } => match code {
                Some(c) => write!(f, "chunkserver {address} returned {c}"),
                None => write!(f, "chunkserver {address} connection failure"),
            },
            ReadError::CrcMismatch => write!(f, "block crc mismatch"),
            ReadError::OutOfOrderBlocks => write!(f, "blocks arrived out of order"),
            ReadError::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for ReadError {}

impl From<WireError> for ReadError {
    fn from(e: WireError) -> Self {
        ReadError::Wire(e)
    }
}

/// Whether a [`ReadError`] warrants replanning with a different scheme
/// (rather than surfacing straight to the caller).
impl ReadError {
    pub fn is_replannable(&self) -> bool {
        !matches!(self, ReadError::ChunkLost)
    }
}

/// Failure in the write pipeline (spec.md §4.5).
#[derive(Debug)]
pub enum WriteError {
    /// Master returned a fatal status (`ENOENT`): do not retry.
    Fatal(ErrorCode),
    /// Transient condition (`LOCKED`, `CHUNKBUSY`, `DELAYED`): retry after backoff.
    Transient(ErrorCode),
    /// Every retry in the configured budget was exhausted.
    RetriesExhausted,
    /// A chain member failed mid-write; caller should rebuild the chain.
    ChainBroken { address: String },
    Wire(WireError),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Fatal(c) => write!(f, "fatal write failure: {c}"),
            WriteError::Transient(c) => write!(f, "transient write failure: {c}"),
            WriteError::RetriesExhausted => write!(f, "write retry budget exhausted"),
            WriteError::ChainBroken { address } => write!(f, "write chain broken at {address}"),
            WriteError::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for WriteError {}

impl From<WireError> for WriteError {
    fn from(e: WireError) -> Self {
        WriteError::Wire(e)
    }
}

impl WriteError {
    pub fn from_code(code: ErrorCode) -> WriteError {
        if matches!(code, ErrorCode::ENoEnt) {
            WriteError::Fatal(code)
        } else if code.is_transient() {
            WriteError::Transient(code)
        } else {
            WriteError::Fatal(code)
        }
    }
}
