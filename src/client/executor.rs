//! Read plan execution: dial the chunk servers a [`Plan`] names, stream
//! their `CSTOCL_READ_DATA` blocks into an output/scratch buffer, then
//! apply the plan's XOR reconstructions. Two-phase, matching
//! `read_plan_executor.cc`'s `executeReadOperations` /
//! `executeXorOperations` split.

use std::time::Duration;

use chunkstore_abi::crc::crc32;
use chunkstore_abi::message::{CLTOCS_READ, CSTOCL_READ_DATA, CSTOCL_READ_STATUS};
use log::warn;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::client::locator::PartLocation;
use crate::client::planner::{BlockSlot, Plan};
use crate::conn::pool::ConnectionPool;
use crate::error::ReadError;
use crate::geometry::{ChunkId, ChunkVersion, Geometry, NetworkAddress};
use crate::wire::argument::{ArgumentIterator, FieldWriter};
use crate::wire::envelope::Envelope;

/// Executes one [`Plan`] against a connection pool, filling `output`
/// (exactly `plan.output_block_count * geometry.block_size` bytes).
pub struct Executor<'a> {
    pool: &'a ConnectionPool,
    geometry: Geometry,
    poll_timeout: Duration,
}

impl<'a> Executor<'a> {
    pub fn new(pool: &'a ConnectionPool, geometry: Geometry, poll_timeout: Duration) -> Executor<'a> {
        Executor { pool, geometry, poll_timeout }
    }

    pub async fn execute(
        &self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        parts: &[PartLocation],
        plan: &Plan,
    ) -> Result<Vec<u8>, ReadError> {
        let block_size = self.geometry.block_size as usize;
        let mut output = vec![0u8; plan.output_block_count as usize * block_size];
        let mut scratch = vec![0u8; plan.scratch_block_count as usize * block_size];

        // Phase 1: fetch every read operation. A poll timeout on any one
        // fails that server and the whole read — the caller replans with
        // a different scheme rather than limping along with a partial
        // buffer. Operations run one at a time against the shared pool;
        // `poll_timeout` still bounds each individual server's
        // responsiveness the way the original's `poll()`-driven executor
        // does per-socket.
        for op in &plan.reads {
            let server = parts
                .iter()
                .find(|p| p.chunk_type == op.chunk_type)
                .map(|p| p.server)
                .expect("planner only emits reads for parts it was given");
            let blocks = self.run_one(chunk_id, version, server, op, block_size).await?;
            for (slot, block) in op.destinations.iter().zip(blocks) {
                place_block(&mut output, &mut scratch, block_size, *slot, &block);
            }
        }

        // Phase 2: reconstruct, XORing each operation's operands in place
        // over the scratch/output buffers.
        for xor in &plan.xors {
            let mut acc = vec![0u8; block_size];
            for operand in &xor.operands {
                let src = read_block(&output, &scratch, block_size, *operand);
                for (a, b) in acc.iter_mut().zip(src) {
                    *a ^= b;
                }
            }
            place_block(&mut output, &mut scratch, block_size, xor.destination, &acc);
        }

        Ok(output)
    }

    async fn run_one(
        &self,
        chunk_id: ChunkId,
        version: ChunkVersion,
        server: NetworkAddress,
        op: &crate::client::planner::ReadOperation,
        block_size: usize,
    ) -> Result<Vec<Vec<u8>>, ReadError> {
        let mut stream = self
            .pool
            .get(server)
            .await
            .map_err(|_| ReadError::Server { address: server.to_string(), code: None })?;

        let mut w = FieldWriter::new();
        w.put_u64(chunk_id.0);
        w.put_u32(version.0);
        w.put_u32(op.part_block_offset * block_size as u32);
        w.put_u32(op.block_count * block_size as u32);
        let request = Envelope::encode_legacy(CLTOCS_READ, &w.into_bytes());

        stream
            .write_all(&request)
            .await
            .map_err(|_| ReadError::Server { address: server.to_string(), code: None })?;

        let mut blocks = Vec::with_capacity(op.block_count as usize);
        let mut last_block_offset: Option<(u16, u16)> = None;
        loop {
            let header = match tokio::time::timeout(self.poll_timeout, read_header(&mut stream)).await {
                Ok(Ok(h)) => h,
                _ => return Err(ReadError::Server { address: server.to_string(), code: None }),
            };

            let mut payload = vec![0u8; header.payload_length() as usize];
            stream
                .read_exact(&mut payload)
                .await
                .map_err(|_| ReadError::Server { address: server.to_string(), code: None })?;

            if header.message_type() == CSTOCL_READ_STATUS {
                let mut it = ArgumentIterator::new(&payload);
                let _chunk_id = it.fetch_u64().map_err(ReadError::Wire)?;
                let status = it.fetch_u8().map_err(ReadError::Wire)?;
                if status != 0 {
                    let code = chunkstore_abi::ErrorCode::try_from(status).ok();
                    return Err(ReadError::Server { address: server.to_string(), code });
                }
                break;
            } else if header.message_type() == CSTOCL_READ_DATA {
                let mut it = ArgumentIterator::new(&payload);
                let _chunk_id = it.fetch_u64().map_err(ReadError::Wire)?;
                let blocknum = it.fetch_u16().map_err(ReadError::Wire)?;
                let offset = it.fetch_u16().map_err(ReadError::Wire)?;
                let size = it.fetch_u32().map_err(ReadError::Wire)?;
                let crc = it.fetch_u32().map_err(ReadError::Wire)?;
                let data = it.fetch_bytes(size as usize).map_err(ReadError::Wire)?;

                if let Some(last) = last_block_offset {
                    if (blocknum, offset) <= last {
                        warn!("out-of-order block from {server}: {blocknum}:{offset} after {last:?}");
                        return Err(ReadError::OutOfOrderBlocks);
                    }
                }
                last_block_offset = Some((blocknum, offset));

                if crc32(data) != crc {
                    warn!("crc mismatch reading from {server}");
                    return Err(ReadError::CrcMismatch);
                }
                blocks.push(data.to_vec());
            } else {
                return Err(ReadError::Server { address: server.to_string(), code: None });
            }
        }

        self.pool.put(server, stream).await;
        Ok(blocks)
    }
}

fn place_block(
    output: &mut [u8],
    scratch: &mut [u8],
    block_size: usize,
    slot: BlockSlot,
    block: &[u8],
) {
    let (buf, index) = match slot {
        BlockSlot::Output(i) => (&mut *output, i as usize),
        BlockSlot::Scratch(i) => (&mut *scratch, i as usize),
    };
    let start = index * block_size;
    buf[start..start + block.len()].copy_from_slice(block);
}

fn read_block<'a>(output: &'a [u8], scratch: &'a [u8], block_size: usize, slot: BlockSlot) -> &'a [u8] {
    let (buf, index) = match slot {
        BlockSlot::Output(i) => (output, i as usize),
        BlockSlot::Scratch(i) => (scratch, i as usize),
    };
    &buf[index * block_size..(index + 1) * block_size]
}

async fn read_header(
    stream: &mut tokio::net::TcpStream,
) -> std::io::Result<chunkstore_abi::header::PacketHeader> {
    let mut buf = [0u8; chunkstore_abi::header::HEADER_SIZE];
    stream.read_exact(&mut buf).await?;
    Ok(chunkstore_abi::header::PacketHeader::from_bytes(&buf))
}
