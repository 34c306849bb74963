//! Connection pool keyed by [`NetworkAddress`], with a short idle TTL.
//!
//! Grounded in `read_plan_executor.cc`'s `ConnectionPool` (`getConnection`
//! / `putConnection`, `kConnectionPoolTimeoutInSeconds = 2`): the read
//! executor and write chain both reuse pooled sockets to the same chunk
//! server across successive requests rather than redialing every time.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::geometry::NetworkAddress;

struct Idle {
    stream: TcpStream,
    returned_at: Instant,
}

/// Default idle TTL before a pooled connection is discarded instead of
/// reused (`kConnectionPoolTimeoutInSeconds` in the original).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct ConnectionPool {
    idle_timeout: Duration,
    idle: Mutex<HashMap<NetworkAddress, Idle>>,
}

impl std::fmt::Debug for Idle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Idle").field("returned_at", &self.returned_at).finish()
    }
}

impl ConnectionPool {
    pub fn new(idle_timeout: Duration) -> ConnectionPool {
        ConnectionPool { idle_timeout, idle: Mutex::new(HashMap::new()) }
    }

    /// Take a pooled connection to `addr` if one is idle and still within
    /// TTL, otherwise dial a fresh one.
    pub async fn get(&self, addr: NetworkAddress) -> io::Result<TcpStream> {
        {
            let mut idle = self.idle.lock().await;
            if let Some(entry) = idle.remove(&addr) {
                if entry.returned_at.elapsed() <= self.idle_timeout {
                    return Ok(entry.stream);
                }
                // Stale: drop it and fall through to redial.
            }
        }
        TcpStream::connect(std::net::SocketAddrV4::from(addr)).await
    }

    /// Return a connection to the pool for potential reuse.
    pub async fn put(&self, addr: NetworkAddress, stream: TcpStream) {
        let mut idle = self.idle.lock().await;
        idle.insert(addr, Idle { stream, returned_at: Instant::now() });
    }

    /// Drop any pooled connection that has outlived its TTL. Intended to
    /// be called periodically by a background task.
    pub async fn sweep(&self) {
        let mut idle = self.idle.lock().await;
        idle.retain(|_, entry| entry.returned_at.elapsed() <= self.idle_timeout);
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        ConnectionPool::new(DEFAULT_IDLE_TIMEOUT)
    }
}
