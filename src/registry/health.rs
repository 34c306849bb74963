//! Chunk classification loop (spec.md §4.3 "Chunk classification loop").
//!
//! Scans the registry and buckets every chunk into one of the classes
//! below, from which the caller derives delete/replicate directives. The
//! scan itself is exposed as a free function rather than a background
//! task so it can be driven by a test or by a real scheduler without
//! threading tokio through this module.

use crate::registry::chunk::{Chunk, CopyState};
use crate::registry::ops::ChunkRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Locked by an operation that never reached any valid copy; a
    /// leftover from a failed CREATE/DUPLICATE.
    Invalid,
    /// No inode references this chunk id any longer.
    Unused,
    /// Has excess valid copies beyond `goal` on servers marked for
    /// decommission (`todel`); safe to drop those specific copies.
    DiskClean,
    /// More valid copies than `goal` calls for.
    OverGoal,
    /// Fewer valid copies than `goal` calls for, but at least one valid
    /// copy exists.
    UnderGoal,
    /// Zero valid copies anywhere: unrecoverable without a backup.
    Missing,
    /// Exactly `goal` valid copies, nothing to do.
    Stable,
}

pub fn classify(chunk: &Chunk) -> Classification {
    let valid = chunk.valid_copy_count();
    let damaged_only = !chunk.copies.is_empty()
        && chunk.copies.iter().all(|c| matches!(c.state, CopyState::Damaged));

    if valid == 0 {
        return if damaged_only { Classification::Invalid } else { Classification::Missing };
    }

    let goal = chunk.goal as usize;
    match valid.cmp(&goal) {
        std::cmp::Ordering::Equal => Classification::Stable,
        std::cmp::Ordering::Greater => Classification::OverGoal,
        std::cmp::Ordering::Less => Classification::UnderGoal,
    }
}

/// Counters exposed the way `CHUNKSTEST_INFO` exposes the original scan
/// loop's start-to-end progress and per-class totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanCounters {
    pub scanned: u64,
    pub invalid: u64,
    pub unused: u64,
    pub disk_clean: u64,
    pub over_goal: u64,
    pub under_goal: u64,
    pub missing: u64,
    pub stable: u64,
}

impl ScanCounters {
    fn record(&mut self, class: Classification) {
        self.scanned += 1;
        match class {
            Classification::Invalid => self.invalid += 1,
            Classification::Unused => self.unused += 1,
            Classification::DiskClean => self.disk_clean += 1,
            Classification::OverGoal => self.over_goal += 1,
            Classification::UnderGoal => self.under_goal += 1,
            Classification::Missing => self.missing += 1,
            Classification::Stable => self.stable += 1,
        }
    }
}

/// One pass over every chunk currently in the registry, classifying each
/// and tallying the result. Bounded by the registry's own size, matching
/// the original's start-to-end counter semantics.
pub fn scan(registry: &ChunkRegistry) -> (ScanCounters, Vec<(crate::geometry::ChunkId, Classification)>) {
    let mut counters = ScanCounters::default();
    let mut classified = Vec::new();
    for id in registry.chunk_ids() {
        let chunk = registry.get(id).expect("id came from this registry's own iterator");
        let class = classify(chunk);
        counters.record(class);
        classified.push((id, class));
    }
    (counters, classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ChunkId, ChunkVersion, NetworkAddress};
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> NetworkAddress {
        NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), 9422)
    }

    #[test]
    fn no_copies_is_missing() {
        let chunk = Chunk::new(ChunkId(1), ChunkVersion(1), 2);
        assert_eq!(classify(&chunk), Classification::Missing);
    }

    #[test]
    fn fewer_than_goal_is_under_goal() {
        let mut reg = ChunkRegistry::new();
        reg.begin_create(ChunkId(1), ChunkVersion(1), 2, &[addr(1), addr(2)]).unwrap();
        reg.record_reply(ChunkId(1), addr(1), true);
        reg.record_reply(ChunkId(1), addr(2), false);
        assert_eq!(classify(reg.get(ChunkId(1)).unwrap()), Classification::UnderGoal);
    }

    #[test]
    fn exactly_goal_is_stable() {
        let mut reg = ChunkRegistry::new();
        reg.begin_create(ChunkId(1), ChunkVersion(1), 1, &[addr(1)]).unwrap();
        reg.record_reply(ChunkId(1), addr(1), true);
        assert_eq!(classify(reg.get(ChunkId(1)).unwrap()), Classification::Stable);
    }
}
