//! Client-side write buffering: a ring of block-sized staging slots, and
//! the ack-tracking structure that correlates out-of-order
//! `CSTOCL_WRITE_STATUS` replies by `writeid`. Grounded in
//! `write_executor.h`'s `Status{chunkId, writeId, status}` record and its
//! `unconfirmedPackets_` counter.

use std::collections::HashMap;

use crate::geometry::ChunkId;

pub type WriteId = u32;

/// One in-flight, not-yet-acknowledged write.
#[derive(Debug, Clone)]
struct Unconfirmed {
    chunk_id: ChunkId,
    block_number: u16,
    data: Vec<u8>,
}

/// Tracks every write sent but not yet acked for one chunk's pipeline.
/// The ring's depth bounds how far the client can run ahead of the
/// slowest chunk server in the chain before it must block.
#[derive(Debug, Default)]
pub struct WriteRing {
    capacity: usize,
    next_write_id: WriteId,
    unconfirmed: HashMap<WriteId, Unconfirmed>,
}

impl WriteRing {
    pub fn new(capacity: usize) -> WriteRing {
        WriteRing { capacity, next_write_id: 1, unconfirmed: HashMap::new() }
    }

    pub fn is_full(&self) -> bool {
        self.unconfirmed.len() >= self.capacity
    }

    /// Register a block about to be sent, returning the `writeid` to tag
    /// it with on the wire.
    pub fn push(&mut self, chunk_id: ChunkId, block_number: u16, data: Vec<u8>) -> WriteId {
        let id = self.next_write_id;
        self.next_write_id = self.next_write_id.wrapping_add(1).max(1);
        self.unconfirmed.insert(id, Unconfirmed { chunk_id, block_number, data });
        id
    }

    /// Acknowledge a `writeid`, regardless of the order acks arrive in.
    /// Returns `false` if the id was unknown (a duplicate or spurious
    /// ack, which the caller should treat as a protocol violation).
    pub fn ack(&mut self, write_id: WriteId) -> bool {
        self.unconfirmed.remove(&write_id).is_some()
    }

    pub fn unconfirmed_count(&self) -> usize {
        self.unconfirmed.len()
    }

    pub fn all_acked(&self) -> bool {
        self.unconfirmed.is_empty()
    }

    /// Every still-unconfirmed write, for replay after a chain rebuild.
    pub fn drain_for_replay(&mut self) -> Vec<(ChunkId, u16, Vec<u8>)> {
        let mut replay: Vec<(WriteId, Unconfirmed)> = self.unconfirmed.drain().collect();
        replay.sort_by_key(|(id, _)| *id);
        replay.into_iter().map(|(_, u)| (u.chunk_id, u.block_number, u.data)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acks_can_arrive_out_of_order() {
        let mut ring = WriteRing::new(4);
        let a = ring.push(ChunkId(1), 0, vec![0; 4]);
        let b = ring.push(ChunkId(1), 1, vec![1; 4]);
        assert!(!ring.all_acked());
        assert!(ring.ack(b));
        assert!(!ring.all_acked());
        assert!(ring.ack(a));
        assert!(ring.all_acked());
    }

    #[test]
    fn unknown_write_id_is_rejected() {
        let mut ring = WriteRing::new(4);
        assert!(!ring.ack(999));
    }

    #[test]
    fn is_full_once_capacity_reached() {
        let mut ring = WriteRing::new(2);
        ring.push(ChunkId(1), 0, vec![]);
        ring.push(ChunkId(1), 1, vec![]);
        assert!(ring.is_full());
    }

    #[test]
    fn replay_preserves_write_order() {
        let mut ring = WriteRing::new(4);
        ring.push(ChunkId(1), 0, vec![0]);
        ring.push(ChunkId(1), 1, vec![1]);
        let replay = ring.drain_for_replay();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].1, 0);
        assert_eq!(replay[1].1, 1);
    }
}
