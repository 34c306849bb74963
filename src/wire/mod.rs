//! Wire protocol: packet framing, typed argument decoding, and the
//! length-prefixed name/path encodings used throughout the other
//! subsystems.

pub mod argument;
pub mod envelope;
pub mod names;

pub use argument::ArgumentIterator;
pub use envelope::{Envelope, PacketSizeLimit};
pub use names::{Name, Path};

/// `ANTOAN_NOP`, sent by either side roughly every `timeout/2` of silence
/// and otherwise ignored.
pub const NOP_MESSAGE_TYPE: chunkstore_abi::message::MessageType =
    chunkstore_abi::message::ANTOAN_NOP;
