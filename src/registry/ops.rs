//! Chunk operation state machine: CREATE, version bump, DUPLICATE/
//! DUPTRUNC, TRUNCATE and REPLICATE, per spec.md §4.3.
//!
//! Each operation locks its chunk (`LockMode`), fans a per-server
//! request out to the servers it needs replies from, and collects those
//! replies one at a time through `record_reply` until every awaited
//! server has answered — mirroring the original's asynchronous
//! `MATOCS_*`/`CSTOMA_*` request/reply pairing, just without the network
//! in between.

use std::collections::HashSet;

use crate::error::ErrorCode;
use crate::geometry::{ChunkId, ChunkVersion, NetworkAddress};
use crate::registry::chunk::{Chunk, Copy, CopyState, LockMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Create,
    SetVersion,
    Duplicate,
    DupTrunc,
    Truncate,
    Replicate,
}

impl OpKind {
    fn lock_mode(self) -> LockMode {
        match self {
            OpKind::Create => LockMode::Writing,
            OpKind::SetVersion => LockMode::SetVersion,
            OpKind::Duplicate => LockMode::Duplicating,
            OpKind::DupTrunc => LockMode::DupTrunc,
            OpKind::Truncate => LockMode::Truncating,
            OpKind::Replicate => LockMode::None,
        }
    }
}

/// An operation in flight against one chunk, waiting on replies from the
/// servers it was issued to.
#[derive(Debug)]
pub struct PendingOp {
    pub kind: OpKind,
    pub chunk_id: ChunkId,
    pub target_version: ChunkVersion,
    awaiting: HashSet<NetworkAddress>,
    succeeded: HashSet<NetworkAddress>,
    failed: HashSet<NetworkAddress>,
}

impl PendingOp {
    fn new(kind: OpKind, chunk_id: ChunkId, target_version: ChunkVersion, targets: &[NetworkAddress]) -> PendingOp {
        PendingOp {
            kind,
            chunk_id,
            target_version,
            awaiting: targets.iter().copied().collect(),
            succeeded: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.awaiting.is_empty()
    }
}

/// What happened once every awaited server has replied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    /// Every target confirmed.
    AllOk,
    /// Some targets confirmed, some didn't; the op still committed to
    /// the extent it could (failing copies marked outdated).
    Partial { succeeded: Vec<NetworkAddress>, failed: Vec<NetworkAddress> },
    /// Nobody confirmed: the operation is a total failure.
    AllFailed(ErrorCode),
}

/// The master's chunk registry: every chunk's state plus operations
/// currently locking one.
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    chunks: std::collections::HashMap<ChunkId, Chunk>,
    pending: std::collections::HashMap<ChunkId, PendingOp>,
}

impl ChunkRegistry {
    pub fn new() -> ChunkRegistry {
        ChunkRegistry::default()
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn insert(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.id, chunk);
    }

    pub fn chunk_ids(&self) -> Vec<ChunkId> {
        self.chunks.keys().copied().collect()
    }

    fn begin(
        &mut self,
        kind: OpKind,
        chunk_id: ChunkId,
        target_version: ChunkVersion,
        targets: &[NetworkAddress],
    ) -> Result<(), ErrorCode> {
        if let Some(chunk) = self.chunks.get_mut(&chunk_id) {
            if chunk.is_locked() {
                return Err(ErrorCode::Locked);
            }
            chunk.lock_mode = kind.lock_mode();
        }
        self.pending.insert(chunk_id, PendingOp::new(kind, chunk_id, target_version, targets));
        Ok(())
    }

    /// **CREATE**: allocate a new chunk on up to `goal` servers (already
    /// ordered by the caller via [`super::selection::select_ordered`]).
    pub fn begin_create(
        &mut self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        goal: u8,
        targets: &[NetworkAddress],
    ) -> Result<(), ErrorCode> {
        self.chunks.insert(chunk_id, Chunk::new(chunk_id, version, goal));
        self.begin(OpKind::Create, chunk_id, version, targets)
    }

    /// **Version bump**: used when a chunk must become writable while an
    /// old version might still be read; reissued to every currently
    /// valid copy.
    pub fn begin_set_version(&mut self, chunk_id: ChunkId, new_version: ChunkVersion) -> Result<(), ErrorCode> {
        let targets: Vec<NetworkAddress> = match self.chunks.get(&chunk_id) {
            Some(chunk) => chunk.valid_copies().map(|c| c.server).collect(),
            None => return Err(ErrorCode::ENoEnt),
        };
        self.begin(OpKind::SetVersion, chunk_id, new_version, &targets)
    }

    /// **REPLICATE**: ask one destination to pull the chunk from `source`.
    pub fn begin_replicate(
        &mut self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        destination: NetworkAddress,
    ) -> Result<(), ErrorCode> {
        self.begin(OpKind::Replicate, chunk_id, version, &[destination])
    }

    /// **DUPLICATE**: copy a chunk's content (unchanged) onto new target
    /// servers, e.g. for snapshot copy-on-write. `chunk_id` is the new
    /// (destination) chunk id; a registry entry for it is created here
    /// if one doesn't exist yet.
    pub fn begin_duplicate(
        &mut self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        goal: u8,
        targets: &[NetworkAddress],
    ) -> Result<(), ErrorCode> {
        self.chunks.entry(chunk_id).or_insert_with(|| Chunk::new(chunk_id, version, goal));
        self.begin(OpKind::Duplicate, chunk_id, version, targets)
    }

    /// **TRUNCATE**: resize an exclusively-held chunk in place.
    pub fn begin_truncate(&mut self, chunk_id: ChunkId, new_version: ChunkVersion) -> Result<(), ErrorCode> {
        let targets: Vec<NetworkAddress> = match self.chunks.get(&chunk_id) {
            Some(chunk) => chunk.valid_copies().map(|c| c.server).collect(),
            None => return Err(ErrorCode::ENoEnt),
        };
        self.begin(OpKind::Truncate, chunk_id, new_version, &targets)
    }

    /// **DUPTRUNC**: duplicate-and-truncate in one orchestrated op, for
    /// an opened file whose shared chunk must be both copied and resized.
    /// `chunk_id` is the new (destination) chunk id; a registry entry
    /// for it is created here if one doesn't exist yet.
    pub fn begin_dup_trunc(
        &mut self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        goal: u8,
        targets: &[NetworkAddress],
    ) -> Result<(), ErrorCode> {
        self.chunks.entry(chunk_id).or_insert_with(|| Chunk::new(chunk_id, version, goal));
        self.begin(OpKind::DupTrunc, chunk_id, version, targets)
    }

    /// Record one server's reply to the chunk's in-flight operation.
    /// Returns `Some(outcome)` once every awaited server has answered.
    pub fn record_reply(
        &mut self,
        chunk_id: ChunkId,
        server: NetworkAddress,
        ok: bool,
    ) -> Option<OpOutcome> {
        let op = self.pending.get_mut(&chunk_id)?;
        if !op.awaiting.remove(&server) {
            return None;
        }
        if ok {
            op.succeeded.insert(server);
        } else {
            op.failed.insert(server);
        }
        if !op.is_done() {
            return None;
        }

        let op = self.pending.remove(&chunk_id).expect("just looked up");
        let outcome = self.finish(&op);
        Some(outcome)
    }

    fn finish(&mut self, op: &PendingOp) -> OpOutcome {
        let chunk = self.chunks.get_mut(&op.chunk_id);

        let outcome = if op.succeeded.is_empty() {
            match op.kind {
                OpKind::Create => OpOutcome::AllFailed(ErrorCode::NotDone),
                OpKind::SetVersion => OpOutcome::AllFailed(ErrorCode::ChunkLost),
                _ => OpOutcome::AllFailed(ErrorCode::NotDone),
            }
        } else if op.failed.is_empty() {
            OpOutcome::AllOk
        } else {
            OpOutcome::Partial {
                succeeded: op.succeeded.iter().copied().collect(),
                failed: op.failed.iter().copied().collect(),
            }
        };

        if let Some(chunk) = chunk {
            apply_outcome(chunk, op, &outcome);
            chunk.lock_mode = LockMode::None;
        }

        outcome
    }
}

fn apply_outcome(chunk: &mut Chunk, op: &PendingOp, outcome: &OpOutcome) {
    match op.kind {
        OpKind::Create | OpKind::Duplicate | OpKind::DupTrunc | OpKind::Replicate => {
            for &server in &op.succeeded {
                if !chunk.has_copy_at(server) {
                    chunk.copies.push(Copy {
                        server,
                        version_seen: op.target_version,
                        state: CopyState::Valid,
                    });
                }
            }
        }
        OpKind::SetVersion => {
            if matches!(outcome, OpOutcome::AllOk) {
                chunk.version = op.target_version;
                for copy in chunk.copies.iter_mut() {
                    if op.succeeded.contains(&copy.server) {
                        copy.version_seen = op.target_version;
                    }
                }
            }
            for &server in &op.failed {
                chunk.set_copy_state(server, CopyState::Outdated);
            }
        }
        OpKind::Truncate => {
            if matches!(outcome, OpOutcome::AllOk | OpOutcome::Partial { .. }) {
                chunk.version = op.target_version;
            }
            for &server in &op.failed {
                chunk.set_copy_state(server, CopyState::Outdated);
            }
        }
    }
}
