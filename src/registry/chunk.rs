//! Master-side chunk state: what spec.md §4.3 calls `Chunk`, `Copy`, and
//! `LockMode`.

use std::collections::HashSet;

use crate::geometry::{ChunkId, ChunkVersion, NetworkAddress};

/// What kind of mutating operation currently holds the chunk's lock.
/// Only one may be in flight at a time; `None` means the chunk is free
/// for a new operation to claim it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    None,
    Writing,
    SetVersion,
    Duplicating,
    Truncating,
    DupTrunc,
}

impl Default for LockMode {
    fn default() -> Self {
        LockMode::None
    }
}

/// Health of one server's copy of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    /// Confirmed present at `version_seen`, safe to read or extend.
    Valid,
    /// Present but at a stale version; kept around for later deletion,
    /// never selected for reads or new writes.
    Outdated,
    /// The server reported `CSTOMA_CHUNK_DAMAGED`; removed from the
    /// valid set immediately per spec.md §4.3.
    Damaged,
    /// Mid-operation (e.g. still being written or replicated); not yet
    /// confirmed.
    Busy,
}

#[derive(Debug, Clone, Copy)]
pub struct Copy {
    pub server: NetworkAddress,
    pub version_seen: ChunkVersion,
    pub state: CopyState,
}

impl Copy {
    pub fn is_valid(&self) -> bool {
        matches!(self.state, CopyState::Valid)
    }
}

/// One chunk's full state as tracked by the master's registry.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: ChunkId,
    pub version: ChunkVersion,
    /// Servers holding a write lock on this chunk (generalizes spec.md's
    /// `lockedTo:Set<Server>` — normally at most one entry, but a
    /// duplicate/truncate fan-out briefly locks several).
    pub locked_to: HashSet<NetworkAddress>,
    pub lock_mode: LockMode,
    pub copies: Vec<Copy>,
    /// Desired replica count (or, for an XOR-erasure chunk, the level).
    pub goal: u8,
}

impl Chunk {
    pub fn new(id: ChunkId, version: ChunkVersion, goal: u8) -> Chunk {
        Chunk {
            id,
            version,
            locked_to: HashSet::new(),
            lock_mode: LockMode::None,
            copies: Vec::new(),
            goal,
        }
    }

    pub fn valid_copies(&self) -> impl Iterator<Item = &Copy> {
        self.copies.iter().filter(|c| c.is_valid())
    }

    pub fn valid_copy_count(&self) -> usize {
        self.valid_copies().count()
    }

    pub fn is_locked(&self) -> bool {
        self.lock_mode != LockMode::None
    }

    /// Mark the copy at `server` (if any) with a new state, e.g. in
    /// response to `CSTOMA_CHUNK_DAMAGED`/`CSTOMA_CHUNK_LOST`.
    pub fn set_copy_state(&mut self, server: NetworkAddress, state: CopyState) {
        if let Some(copy) = self.copies.iter_mut().find(|c| c.server == server) {
            copy.state = state;
        }
    }

    /// Drop a server's copy entirely, e.g. once `CSTOMA_CHUNK_LOST` has
    /// been acted on and no grace period is owed.
    pub fn remove_copy(&mut self, server: NetworkAddress) {
        self.copies.retain(|c| c.server != server);
    }

    pub fn has_copy_at(&self, server: NetworkAddress) -> bool {
        self.copies.iter().any(|c| c.server == server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> NetworkAddress {
        NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), 9422)
    }

    #[test]
    fn valid_copy_count_ignores_non_valid() {
        let mut chunk = Chunk::new(ChunkId(1), ChunkVersion(1), 2);
        chunk.copies.push(Copy { server: addr(1), version_seen: ChunkVersion(1), state: CopyState::Valid });
        chunk.copies.push(Copy { server: addr(2), version_seen: ChunkVersion(1), state: CopyState::Outdated });
        assert_eq!(chunk.valid_copy_count(), 1);
    }

    #[test]
    fn damaged_report_drops_copy_from_valid_set() {
        let mut chunk = Chunk::new(ChunkId(1), ChunkVersion(1), 1);
        chunk.copies.push(Copy { server: addr(1), version_seen: ChunkVersion(1), state: CopyState::Valid });
        chunk.set_copy_state(addr(1), CopyState::Damaged);
        assert_eq!(chunk.valid_copy_count(), 0);
    }
}
