//! Pure, network-free read planning: choosing which chunk parts to fetch
//! for a requested byte range and how to reassemble them, per spec.md
//! §4.4's preference order. Grounded in `read_plan_executor.h`'s
//! `ReadPlan`/`ReadOperation`/`XorBlockOperation` shapes; kept dependency-
//! free of sockets so it can be (and is) unit-tested on its own, mirroring
//! the original's standalone `read_operation_planner_unittest.cc`.

use std::collections::BTreeMap;

use crate::abi::chunk_type::{ChunkType, XorPart};
use crate::client::locator::PartLocation;
use crate::geometry::Geometry;

/// Where a fetched or reconstructed block ends up: either directly in the
/// caller's output buffer, or in scratch space reserved for XOR inputs
/// that never reach the caller on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSlot {
    Output(u32),
    Scratch(u32),
}

/// A contiguous run of blocks to fetch from one chunk part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOperation {
    pub chunk_type: ChunkType,
    /// First block index *within that part's own linear numbering* (not
    /// the file's global block numbering).
    pub part_block_offset: u32,
    pub block_count: u32,
    /// One destination slot per block in the run, in order.
    pub destinations: Vec<BlockSlot>,
}

/// Reconstruct one missing data block as the XOR of the listed operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorBlockOperation {
    pub destination: BlockSlot,
    pub operands: Vec<BlockSlot>,
}

/// A complete plan: what to read, what to XOR, and how many scratch
/// blocks the executor must allocate alongside the `block_count`-sized
/// output buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub reads: Vec<ReadOperation>,
    pub xors: Vec<XorBlockOperation>,
    pub output_block_count: u32,
    pub scratch_block_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// No complete replica or XOR scheme covers the requested range.
    NoCompleteScheme,
}

/// Plan a read of `size` bytes starting at `offset_in_chunk`, choosing
/// among the parts the locator reported, per spec.md §4.4's preference
/// order (standard copy, then complete XOR data parts, then parity plus
/// the rest of the data parts, then failure).
pub fn plan(
    parts: &[PartLocation],
    geometry: Geometry,
    offset_in_chunk: u64,
    size: u64,
) -> Result<Plan, PlanError> {
    if size == 0 {
        return Ok(Plan::default());
    }
    let first_block = (offset_in_chunk / geometry.block_size as u64) as u32;
    let last_block = ((offset_in_chunk + size - 1) / geometry.block_size as u64) as u32;
    let block_count = last_block - first_block + 1;

    if let Some(standard) = parts.iter().find(|p| p.chunk_type.is_standard()) {
        return Ok(plan_standard(standard.chunk_type, first_block, block_count));
    }

    // Group XOR parts by level, highest level first (spec.md: "highest
    // available Xor(L)").
    let mut by_level: BTreeMap<u8, BTreeMap<XorPart, ChunkType>> = BTreeMap::new();
    for p in parts {
        if let ChunkType::Xor { level, part } = p.chunk_type {
            by_level.entry(level).or_default().insert(part, p.chunk_type);
        }
    }

    for (&level, present) in by_level.iter().rev() {
        let data_present: Vec<u8> =
            (1..=level).filter(|k| present.contains_key(&XorPart::Data(*k))).collect();

        if data_present.len() as u8 == level {
            return Ok(plan_complete_xor(level, present, first_block, block_count));
        }

        let missing: Vec<u8> = (1..=level).filter(|k| !data_present.contains(k)).collect();
        if missing.len() == 1 && present.contains_key(&XorPart::Parity) {
            return Ok(plan_parity_reconstruction(
                level,
                missing[0],
                present,
                first_block,
                block_count,
            ));
        }
    }

    Err(PlanError::NoCompleteScheme)
}

fn plan_standard(chunk_type: ChunkType, first_block: u32, block_count: u32) -> Plan {
    Plan {
        reads: vec![ReadOperation {
            chunk_type,
            part_block_offset: first_block,
            block_count,
            destinations: (0..block_count).map(BlockSlot::Output).collect(),
        }],
        xors: Vec::new(),
        output_block_count: block_count,
        scratch_block_count: 0,
    }
}

/// Every global block `b` in `[first_block, first_block+block_count)`
/// belongs to data part `(b % level) + 1`, at part-local index `b /
/// level`. Blocks bound for the same part form a contiguous run in the
/// part's own numbering because global block numbers increase by exactly
/// `level` between successive visits to the same part.
fn plan_complete_xor(
    level: u8,
    present: &BTreeMap<XorPart, ChunkType>,
    first_block: u32,
    block_count: u32,
) -> Plan {
    let mut reads = Vec::new();
    for k in 1..=level {
        let chunk_type = present[&XorPart::Data(k)];
        let mut destinations = Vec::new();
        let mut part_block_offset = None;
        for global in first_block..first_block + block_count {
            if global % level as u32 == (k - 1) as u32 {
                if part_block_offset.is_none() {
                    part_block_offset = Some(global / level as u32);
                }
                destinations.push(BlockSlot::Output(global - first_block));
            }
        }
        if let Some(offset) = part_block_offset {
            reads.push(ReadOperation {
                chunk_type,
                part_block_offset: offset,
                block_count: destinations.len() as u32,
                destinations,
            });
        }
    }
    Plan { reads, xors: Vec::new(), output_block_count: block_count, scratch_block_count: 0 }
}

/// One data part (`missing`) isn't available; its blocks are
/// reconstructed by XORing parity with the `level - 1` present data
/// parts at the same part-local stripe index.
fn plan_parity_reconstruction(
    level: u8,
    missing: u8,
    present: &BTreeMap<XorPart, ChunkType>,
    first_block: u32,
    block_count: u32,
) -> Plan {
    let mut reads = Vec::new();
    let mut xors = Vec::new();
    let mut next_scratch = 0u32;

    // Direct reads for every present data part's own blocks.
    for k in 1..=level {
        if k == missing {
            continue;
        }
        let chunk_type = present[&XorPart::Data(k)];
        let mut destinations = Vec::new();
        let mut part_block_offset = None;
        for global in first_block..first_block + block_count {
            if global % level as u32 == (k - 1) as u32 {
                if part_block_offset.is_none() {
                    part_block_offset = Some(global / level as u32);
                }
                destinations.push(BlockSlot::Output(global - first_block));
            }
        }
        if let Some(offset) = part_block_offset {
            reads.push(ReadOperation {
                chunk_type,
                part_block_offset: offset,
                block_count: destinations.len() as u32,
                destinations,
            });
        }
    }

    // The missing part's blocks: stripe indices we need to reconstruct.
    let stripes: Vec<u32> = (first_block..first_block + block_count)
        .filter(|g| g % level as u32 == (missing - 1) as u32)
        .map(|g| g / level as u32)
        .collect();

    if stripes.is_empty() {
        return Plan { reads, xors, output_block_count: block_count, scratch_block_count: 0 };
    }
    let stripe_start = stripes[0];
    let stripe_count = stripes.len() as u32;

    // Parity, fetched into scratch for each needed stripe.
    let parity_type = present[&XorPart::Parity];
    let parity_scratch: Vec<BlockSlot> =
        (0..stripe_count).map(|i| BlockSlot::Scratch(next_scratch + i)).collect();
    reads.push(ReadOperation {
        chunk_type: parity_type,
        part_block_offset: stripe_start,
        block_count: stripe_count,
        destinations: parity_scratch.clone(),
    });
    next_scratch += stripe_count;

    // Every other present data part, fetched at the same stripes into
    // their own scratch slots.
    let mut operand_columns: Vec<Vec<BlockSlot>> = vec![parity_scratch];
    for k in 1..=level {
        if k == missing {
            continue;
        }
        let chunk_type = present[&XorPart::Data(k)];
        let scratch: Vec<BlockSlot> =
            (0..stripe_count).map(|i| BlockSlot::Scratch(next_scratch + i)).collect();
        reads.push(ReadOperation {
            chunk_type,
            part_block_offset: stripe_start,
            block_count: stripe_count,
            destinations: scratch.clone(),
        });
        next_scratch += stripe_count;
        operand_columns.push(scratch);
    }

    for (i, &stripe) in stripes.iter().enumerate() {
        let global = stripe * level as u32 + (missing - 1) as u32;
        let operands = operand_columns.iter().map(|col| col[i]).collect();
        xors.push(XorBlockOperation { destination: BlockSlot::Output(global - first_block), operands });
    }

    Plan { reads, xors, output_block_count: block_count, scratch_block_count: next_scratch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, NetworkAddress};
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> NetworkAddress {
        NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), 9422)
    }

    fn part(chunk_type: ChunkType, n: u8) -> PartLocation {
        PartLocation { chunk_type, server: addr(n) }
    }

    #[test]
    fn prefers_standard_copy_when_available() {
        let parts = vec![
            part(ChunkType::Standard, 1),
            part(ChunkType::xor(2, XorPart::Data(1)).unwrap(), 2),
        ];
        let plan = plan(&parts, Geometry::STANDARD, 0, geometry_block_size() as u64 * 3).unwrap();
        assert_eq!(plan.reads.len(), 1);
        assert!(plan.reads[0].chunk_type.is_standard());
        assert!(plan.xors.is_empty());
    }

    #[test]
    fn complete_xor_data_parts_need_no_reconstruction() {
        let level = 3;
        let parts: Vec<PartLocation> = (1..=level)
            .map(|k| part(ChunkType::xor(level, XorPart::Data(k)).unwrap(), k))
            .collect();
        let block = geometry_block_size() as u64;
        let plan = plan(&parts, Geometry::STANDARD, 0, block * (level as u64 * 2)).unwrap();
        assert_eq!(plan.reads.len(), level as usize);
        assert!(plan.xors.is_empty());
        let total_blocks: u32 = plan.reads.iter().map(|r| r.block_count).sum();
        assert_eq!(total_blocks, plan.output_block_count);
    }

    #[test]
    fn parity_reconstructs_the_one_missing_data_part() {
        let level = 3;
        let mut parts = vec![part(ChunkType::xor(level, XorPart::Parity).unwrap(), 0)];
        parts.push(part(ChunkType::xor(level, XorPart::Data(1)).unwrap(), 1));
        parts.push(part(ChunkType::xor(level, XorPart::Data(2)).unwrap(), 2));
        // Data part 3 is missing.
        let block = geometry_block_size() as u64;
        let plan = plan(&parts, Geometry::STANDARD, 0, block * (level as u64 * 2)).unwrap();
        assert!(!plan.xors.is_empty());
        assert!(plan.scratch_block_count > 0);
        // Every xor destination should land in the output range.
        for x in &plan.xors {
            assert!(matches!(x.destination, BlockSlot::Output(_)));
        }
    }

    #[test]
    fn no_scheme_fails_with_chunk_lost() {
        let parts = vec![part(ChunkType::xor(3, XorPart::Data(1)).unwrap(), 1)];
        let block = geometry_block_size() as u64;
        let err = plan(&parts, Geometry::STANDARD, 0, block).unwrap_err();
        assert_eq!(err, PlanError::NoCompleteScheme);
    }

    fn geometry_block_size() -> u32 {
        Geometry::STANDARD.block_size
    }
}
