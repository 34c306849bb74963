//! Master-side in-memory changelog ring, streamed to registered
//! metaloggers by [`super::stream`].
//!
//! Grounded in `mfsmaster/matomlserv.c`'s `old_changes_block` list: a
//! singly-linked chain of fixed-capacity blocks, each holding entries
//! `(version, line)` plus the timestamp of its first entry, evicted from
//! the head once that timestamp is older than
//! `ChangelogSecondsToRemember`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One numbered change-log line, matching spec.md §6's
/// `version: TS|OP(args):result` text format (the ring stores the
/// already-formatted line; formatting it is the registry's job).
#[derive(Debug, Clone)]
pub struct ChangelogEntry {
    pub version: u64,
    pub line: String,
    pub recorded_at: Instant,
}

/// One block of up to `block_size` entries, mirroring
/// `OLD_CHANGES_BLOCK_SIZE`-sized `old_changes_block`s so eviction can
/// drop a whole block at a time instead of walking entry-by-entry.
#[derive(Debug)]
struct Block {
    entries: VecDeque<ChangelogEntry>,
    capacity: usize,
}

impl Block {
    fn new(capacity: usize) -> Block {
        Block { entries: VecDeque::with_capacity(capacity), capacity }
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn oldest_timestamp(&self) -> Option<Instant> {
        self.entries.front().map(|e| e.recorded_at)
    }
}

/// Bounded ring of recent changelog entries kept in memory so a
/// metalogger that's only briefly behind can resume without touching
/// disk. Entries older than `seconds_to_remember` are evicted a block
/// at a time, matching the original's "only look at `head->next`'s
/// oldest timestamp" eviction check.
#[derive(Debug)]
pub struct ChangelogRing {
    blocks: VecDeque<Block>,
    block_size: usize,
    seconds_to_remember: Duration,
}

impl ChangelogRing {
    pub fn new(block_size: usize, seconds_to_remember: u32) -> ChangelogRing {
        ChangelogRing {
            blocks: VecDeque::new(),
            block_size,
            seconds_to_remember: Duration::from_secs(seconds_to_remember as u64),
        }
    }

    /// Append one entry, starting a fresh block if the current tail is
    /// full, then evict any blocks that have fully aged out.
    pub fn push(&mut self, version: u64, line: String, now: Instant) {
        if self.blocks.back().map_or(true, |b| b.is_full()) {
            self.blocks.push_back(Block::new(self.block_size));
        }
        self.blocks.back_mut().unwrap().entries.push_back(ChangelogEntry { version, line, recorded_at: now });
        self.evict_aged_out(now);
    }

    fn evict_aged_out(&mut self, now: Instant) {
        while let Some(front) = self.blocks.front() {
            match front.oldest_timestamp() {
                Some(ts) if now.duration_since(ts) > self.seconds_to_remember => {
                    self.blocks.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Smallest version still held in memory, or `None` if the ring is
    /// empty (everything has aged out or nothing was ever logged).
    pub fn oldest_version(&self) -> Option<u64> {
        self.blocks.front().and_then(|b| b.entries.front()).map(|e| e.version)
    }

    pub fn newest_version(&self) -> Option<u64> {
        self.blocks.back().and_then(|b| b.entries.back()).map(|e| e.version)
    }

    /// Entries with `version >= since`, in ascending order, or `None` if
    /// `since` predates what's still in memory — the caller must then
    /// fall back to on-disk `changelog.N.mfs` files per spec.md §4.7.
    pub fn entries_since(&self, since: u64) -> Option<Vec<&ChangelogEntry>> {
        if self.blocks.is_empty() {
            return if since == 0 { Some(Vec::new()) } else { None };
        }
        if self.oldest_version().is_some_and(|oldest| since < oldest) {
            return None;
        }
        Some(
            self.blocks
                .iter()
                .flat_map(|b| b.entries.iter())
                .filter(|e| e.version >= since)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u64) -> String {
        format!("{n}: 0|ACCESS():0")
    }

    #[test]
    fn entries_since_spans_multiple_blocks() {
        let mut ring = ChangelogRing::new(2, 600);
        let now = Instant::now();
        for v in 1..=5 {
            ring.push(v, line(v), now);
        }
        let since_3 = ring.entries_since(3).unwrap();
        assert_eq!(since_3.iter().map(|e| e.version).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn since_older_than_retained_window_returns_none() {
        let mut ring = ChangelogRing::new(2, 600);
        let now = Instant::now();
        for v in 1..=5 {
            ring.push(v, line(v), now);
        }
        // Force the first block out by pushing with a clock far enough
        // ahead that its timestamp ages past the retention window.
        let later = now + Duration::from_secs(700);
        ring.push(6, line(6), later);
        assert!(ring.entries_since(1).is_none());
    }

    #[test]
    fn empty_ring_only_satisfies_since_zero() {
        let ring = ChangelogRing::new(100, 600);
        assert_eq!(ring.entries_since(0), Some(Vec::new()));
        assert!(ring.entries_since(1).is_none());
    }
}
