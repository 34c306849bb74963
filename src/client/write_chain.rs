//! Write chain construction: the ordered list of chunk server addresses a
//! write is piped through, and the initial `CLTOCS_WRITE` message that
//! establishes it. Grounded in
//! `chunkserver_write_chain.cc`'s `createInitialMessage` and
//! `createNewChunkserverConnection`'s doubling-timeout connect retry.

use chunkstore_abi::message::CLTOCS_WRITE;
use tokio::net::TcpStream;

use crate::error::WriteError;
use crate::geometry::{ChunkId, ChunkVersion, NetworkAddress};
use crate::retry::RetryPolicy;
use crate::wire::argument::FieldWriter;
use crate::wire::envelope::Envelope;

/// An ordered list of chunk servers a write chains through: the client
/// connects only to `addresses[0]` (the head); each server forwards to
/// its successor.
#[derive(Debug, Clone)]
pub struct WriteChain {
    pub addresses: Vec<NetworkAddress>,
}

impl WriteChain {
    pub fn new(addresses: Vec<NetworkAddress>) -> WriteChain {
        WriteChain { addresses }
    }

    pub fn head(&self) -> Option<NetworkAddress> {
        self.addresses.first().copied()
    }

    /// Build the `CLTOCS_WRITE` payload: `chunkid:64 version:32`, then
    /// `ip:32 port:16` for every server *after* the head (the head itself
    /// is who we're connecting to, not part of the chain it's told
    /// about).
    pub fn build_init_message(&self, chunk_id: ChunkId, version: ChunkVersion) -> Vec<u8> {
        let mut w = FieldWriter::new();
        w.put_u64(chunk_id.0);
        w.put_u32(version.0);
        for addr in self.addresses.iter().skip(1) {
            w.put_u32(u32::from(addr.ip));
            w.put_u16(addr.port);
        }
        Envelope::encode_legacy(CLTOCS_WRITE, &w.into_bytes())
    }

    /// Connect to the head of the chain, retrying per `policy` with its
    /// doubling backoff (`createNewChunkserverConnection`'s schedule).
    pub async fn connect_head(&self, policy: RetryPolicy) -> Result<TcpStream, WriteError> {
        let head = self.head().ok_or(WriteError::ChainBroken { address: String::from("<empty chain>") })?;
        let mut attempt = 0;
        loop {
            match TcpStream::connect(std::net::SocketAddrV4::from(head)).await {
                Ok(stream) => return Ok(stream),
                Err(_) if !policy.exhausted(attempt) => {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(_) => {
                    return Err(WriteError::ChainBroken { address: head.to_string() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(n: u8, port: u16) -> NetworkAddress {
        NetworkAddress::new(Ipv4Addr::new(10, 0, 0, n), port)
    }

    #[test]
    fn init_message_carries_every_server_after_the_head() {
        let chain = WriteChain::new(vec![addr(1, 9001), addr(2, 9002), addr(3, 9003)]);
        let packet = chain.build_init_message(ChunkId(7), ChunkVersion(1));
        // header(8) + chunkid(8) + version(4) + 2 * (ip(4) + port(2))
        assert_eq!(packet.len(), 8 + 8 + 4 + 2 * 6);
    }

    #[test]
    fn single_server_chain_has_no_extra_addresses() {
        let chain = WriteChain::new(vec![addr(1, 9001)]);
        let packet = chain.build_init_message(ChunkId(7), ChunkVersion(1));
        assert_eq!(packet.len(), 8 + 8 + 4);
    }
}
