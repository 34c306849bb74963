//! Wire-level types shared by master, chunk server, client and metalogger.
//!
//! Everything here is a byte-for-byte description of what goes on the
//! network: packet envelopes, message type codes, the fixed attribute
//! record, the chunk type encoding and the block checksum. None of it
//! knows about sockets, tokio, or any particular peer's state machine —
//! that lives in the `chunkstore` crate.

pub mod attr;
pub mod chunk_type;
pub mod crc;
pub mod error;
pub mod header;
pub mod message;

pub use attr::AttrRecord;
pub use chunk_type::ChunkType;
pub use error::ErrorCode;
pub use header::PacketHeader;
pub use message::MessageType;
