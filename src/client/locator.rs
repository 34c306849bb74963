//! Chunk locator: `CLTOMA_FUSE_READ_CHUNK`/`CLTOMA_FUSE_WRITE_CHUNK`
//! round trips to the master, per spec.md §4.4's first paragraph.

use crate::abi::chunk_type::ChunkType;
use crate::error::LocateError;
use crate::geometry::{ChunkId, ChunkVersion, NetworkAddress};

/// Where one chunk part physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLocation {
    pub chunk_type: ChunkType,
    pub server: NetworkAddress,
}

/// The master's answer to "where is chunk `index` of inode `inode`".
#[derive(Debug, Clone)]
pub struct ChunkLocation {
    /// Length of the *file*, not just this chunk; used to clamp reads
    /// that run past EOF.
    pub file_length: u64,
    pub chunk_id: ChunkId,
    pub version: ChunkVersion,
    pub parts: Vec<PartLocation>,
}

/// Resolves `(inode, chunk index)` to a chunk's id/version/locations.
/// `chunk_id == 0` in the underlying protocol means "hole"; this trait
/// surfaces that as `Ok(None)` instead, so callers can't forget to check.
pub trait ChunkLocator {
    async fn locate_for_read(
        &self,
        inode: u32,
        chunk_index: u32,
    ) -> Result<Option<ChunkLocation>, LocateError>;

    async fn locate_for_write(
        &self,
        inode: u32,
        chunk_index: u32,
    ) -> Result<ChunkLocation, LocateError>;
}
