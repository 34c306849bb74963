//! Shared retry/backoff policy.
//!
//! Grounded in `ChunkserverWriteChain::createNewChunkserverConnection`'s
//! connect-retry loop: up to 10 attempts, with a timeout that alternates
//! between two doubling sequences (`200 * 2^(n/2)` and `300 * 2^(n/2)`
//! milliseconds) so odd and even attempts don't converge on exactly the
//! same wait. The read planner and master-registration paths reuse the
//! same object rather than each hand-rolling a backoff loop.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    base_even_ms: u64,
    base_odd_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_even_ms: u64, base_odd_ms: u64) -> Self {
        RetryPolicy { max_attempts, base_even_ms, base_odd_ms }
    }

    /// Delay to wait before attempt number `n` (0-indexed, `n=0` is the
    /// very first try and returns zero — nothing has failed yet).
    pub fn backoff(self, n: u32) -> Duration {
        if n == 0 {
            return Duration::ZERO;
        }
        let shift = n / 2;
        let base = if n % 2 == 0 { self.base_even_ms } else { self.base_odd_ms };
        let ms = base.saturating_mul(1u64 << shift.min(20));
        Duration::from_millis(ms)
    }

    pub fn exhausted(self, attempts_made: u32) -> bool {
        attempts_made >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// `max 10 tries`, `200ms`/`300ms` doubling bases, matching the
    /// original chunkserver-connect retry loop exactly.
    fn default() -> Self {
        RetryPolicy::new(10, 200, 300)
    }
}

/// Long-interval backoff for cluster-wide exhaustion
/// (`ErrorCode::NoChunkServers`/`NoSpace`), per spec.md §7: a flat
/// interval rather than a doubling sequence, since retrying faster
/// won't make free chunkservers appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRetryPolicy {
    pub interval: Duration,
}

impl Default for FlatRetryPolicy {
    fn default() -> Self {
        FlatRetryPolicy { interval: Duration::from_secs(60) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_backoff() {
        assert_eq!(RetryPolicy::default().backoff(0), Duration::ZERO);
    }

    #[test]
    fn backoff_doubles_every_two_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(!policy.exhausted(9));
        assert!(policy.exhausted(10));
    }
}
