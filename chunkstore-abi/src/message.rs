//! Wire message type codes.
//!
//! Values are taken verbatim from the protocol's definition (`PROTO_BASE`
//! is 0) so that any two implementations of this spec agree on the byte
//! that identifies a message, independent of how each side represents the
//! payload in memory.

/// A raw wire message type. Legacy range is `[0, 1000]`, versioned range
/// is `[1001, 2000]`.
pub type MessageType = u32;

pub const ANTOAN_NOP: MessageType = 0;
pub const ANTOAN_UNKNOWN_COMMAND: MessageType = 1;
pub const ANTOAN_BAD_COMMAND_SIZE: MessageType = 2;

// metalogger <-> master
pub const MLTOMA_REGISTER: MessageType = 50;
pub const MATOML_METACHANGES_LOG: MessageType = 51;
pub const MLTOMA_DOWNLOAD_START: MessageType = 60;
pub const MATOML_DOWNLOAD_START: MessageType = 61;
pub const MLTOMA_DOWNLOAD_DATA: MessageType = 62;
pub const MATOML_DOWNLOAD_DATA: MessageType = 63;
pub const MLTOMA_DOWNLOAD_END: MessageType = 64;

/// Tag byte inside `MATOML_METACHANGES_LOG` introducing one log line.
pub const METACHANGES_LOG_DATA_TAG: u8 = 0xFF;
/// Tag byte inside `MATOML_METACHANGES_LOG` signalling a changelog rotation.
pub const METACHANGES_LOG_ROTATE_TAG: u8 = 0x55;

// chunkserver <-> master
pub const CSTOMA_REGISTER: MessageType = 100;
pub const CSTOMA_SPACE: MessageType = 101;
pub const CSTOMA_CHUNK_DAMAGED: MessageType = 102;
pub const CSTOMA_CHUNK_LOST: MessageType = 105;
pub const CSTOMA_ERROR_OCCURRED: MessageType = 106;
pub const CSTOMA_CHUNK_NEW: MessageType = 107;

pub const MATOCS_CREATE: MessageType = 110;
pub const CSTOMA_CREATE: MessageType = 111;
pub const MATOCS_DELETE: MessageType = 120;
pub const CSTOMA_DELETE: MessageType = 121;
pub const MATOCS_DUPLICATE: MessageType = 130;
pub const CSTOMA_DUPLICATE: MessageType = 131;
pub const MATOCS_SET_VERSION: MessageType = 140;
pub const CSTOMA_SET_VERSION: MessageType = 141;
pub const MATOCS_REPLICATE: MessageType = 150;
pub const CSTOMA_REPLICATE: MessageType = 151;
pub const MATOCS_TRUNCATE: MessageType = 160;
pub const CSTOMA_TRUNCATE: MessageType = 161;
pub const MATOCS_DUPTRUNC: MessageType = 170;
pub const CSTOMA_DUPTRUNC: MessageType = 171;

// chunkserver <-> client/chunkserver
pub const CLTOCS_READ: MessageType = 200;
pub const CSTOCL_READ_STATUS: MessageType = 201;
pub const CSTOCL_READ_DATA: MessageType = 202;
pub const CLTOCS_WRITE: MessageType = 210;
pub const CSTOCL_WRITE_STATUS: MessageType = 211;
pub const CLTOCS_WRITE_DATA: MessageType = 212;
pub const CLTOCS_WRITE_FINISH: MessageType = 213;

// client <-> master
pub const CLTOMA_FUSE_REGISTER: MessageType = 400;
pub const MATOCL_FUSE_REGISTER: MessageType = 401;
pub const CLTOMA_FUSE_READ_CHUNK: MessageType = 432;
pub const MATOCL_FUSE_READ_CHUNK: MessageType = 433;
pub const CLTOMA_FUSE_WRITE_CHUNK: MessageType = 434;
pub const MATOCL_FUSE_WRITE_CHUNK: MessageType = 435;
pub const CLTOMA_FUSE_WRITE_CHUNK_END: MessageType = 436;
pub const MATOCL_FUSE_WRITE_CHUNK_END: MessageType = 437;

/// `CSTOMA_REGISTER`'s newest sub-protocol revision this implementation speaks.
pub const CSTOMA_REGISTER_RVER: u8 = 5;
/// `MLTOMA_REGISTER`'s sub-protocol revision for version-bounded resumption.
pub const MLTOMA_REGISTER_RVER: u8 = 2;
