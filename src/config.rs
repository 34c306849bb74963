//! Per-role configuration.
//!
//! Each peer role gets its own plain struct with a `default()` impl
//! carrying the original's compiled-in defaults (`mfsmaster/cfg.c`-style
//! `cfg_getuint16(name, default)` calls), rather than a global config
//! table. Constructed once at startup and passed down by reference, the
//! way the teacher threads `MountOption`s through `Session`.

use std::time::Duration;

/// Shared by every role: how long a registered connection may sit idle
/// before a `NOP` keepalive is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub nop_interval: Duration,
}

impl Default for KeepAlive {
    fn default() -> Self {
        KeepAlive { nop_interval: Duration::from_secs(1) }
    }
}

/// Master-side configuration: registry bookkeeping and changelog retention.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub keepalive: KeepAlive,
    /// `MATOML_LOG_PRESERVE_SECONDS`, clamped to 3600 in the original.
    pub changelog_seconds_to_remember: u32,
    /// Entries per changelog block, matching `OLD_CHANGES_BLOCK_SIZE`.
    pub changelog_block_size: usize,
    /// Minimum interval between a chunk's successive endangered-copy scans.
    pub chunk_health_scan_interval: Duration,
}

impl MasterConfig {
    pub const MAX_CHANGELOG_SECONDS: u32 = 3600;

    pub fn with_changelog_seconds(mut self, seconds: u32) -> Self {
        self.changelog_seconds_to_remember = seconds.min(Self::MAX_CHANGELOG_SECONDS);
        self
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        MasterConfig {
            keepalive: KeepAlive::default(),
            changelog_seconds_to_remember: 600,
            changelog_block_size: 5000,
            chunk_health_scan_interval: Duration::from_secs(1),
        }
    }
}

/// Chunk-server-facing configuration used by the client and master when
/// dialing out.
#[derive(Debug, Clone, Copy)]
pub struct ConnectConfig {
    pub keepalive: KeepAlive,
    /// How long an idle pooled connection may be reused before it's closed
    /// and redialed (`kConnectionPoolTimeoutInSeconds` in the original).
    pub pool_idle_timeout: Duration,
    /// Poll timeout used by the read executor's event loop
    /// (`kPollTimeoutInMilliseconds`).
    pub poll_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            keepalive: KeepAlive::default(),
            pool_idle_timeout: Duration::from_secs(2),
            poll_timeout: Duration::from_millis(5000),
        }
    }
}

/// Client-side configuration: read planning and write pipeline knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect: ConnectConfig,
    pub retry: crate::retry::RetryPolicy,
    /// Maximum chunkservers kept open concurrently by one read plan
    /// executor, mirroring the original's unbounded-but-practically-small
    /// fan-out per chunk.
    pub max_concurrent_reads: usize,
    /// Depth of the write ring buffer (in-flight, unacknowledged blocks).
    pub write_ring_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect: ConnectConfig::default(),
            retry: crate::retry::RetryPolicy::default(),
            max_concurrent_reads: 4,
            write_ring_capacity: 16,
        }
    }
}

/// Metalogger configuration: how it talks to the master's changelog feed.
#[derive(Debug, Clone, Copy)]
pub struct MetaloggerConfig {
    pub connect: ConnectConfig,
    /// How often to re-request a full metadata image when the changelog
    /// gap can no longer be bridged incrementally.
    pub resync_backoff: Duration,
}

impl Default for MetaloggerConfig {
    fn default() -> Self {
        MetaloggerConfig {
            connect: ConnectConfig::default(),
            resync_backoff: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changelog_seconds_clamp_to_one_hour() {
        let cfg = MasterConfig::default().with_changelog_seconds(10_000);
        assert_eq!(cfg.changelog_seconds_to_remember, MasterConfig::MAX_CHANGELOG_SECONDS);
    }
}
