//! Follower-side bookkeeping: applies streamed [`StreamFrame`]s in order,
//! detects gaps, and decides when a full metadata re-download is owed.
//!
//! Grounded in spec.md §4.7's gap-detection rule
//! (`received.version == last_applied + 1`) and §8's property 8
//! (change-log continuity): any hole must force a fresh dump rather than
//! silently skip versions.

use crate::metalogger::stream::StreamFrame;

/// What the follower should do after applying (or failing to apply) one
/// streamed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Applied in sequence; `last_applied` is now this version.
    Applied,
    /// The master rotated; the follower should close/rename its local
    /// changelog ring. `last_applied` is unchanged.
    Rotated,
    /// A gap was detected: `expected` was wanted but `got` arrived
    /// instead. The follower must drop all local logs and request a
    /// fresh metadata dump — never silently adopt `got`.
    GapDetected { expected: u64, got: u64 },
}

/// Tracks the last version this follower has durably applied and
/// classifies each incoming frame against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowerState {
    last_applied: Option<u64>,
}

impl FollowerState {
    pub fn new(last_applied: Option<u64>) -> FollowerState {
        FollowerState { last_applied }
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Apply one frame, advancing `last_applied` on success. A gap does
    /// *not* advance `last_applied` — the caller must call
    /// [`FollowerState::reset_for_resync`] once the fresh dump lands.
    pub fn apply(&mut self, frame: &StreamFrame) -> ApplyOutcome {
        match frame {
            StreamFrame::Rotate => ApplyOutcome::Rotated,
            StreamFrame::Log { version, .. } => {
                let expected = self.last_applied.map_or(*version, |v| v + 1);
                if *version != expected {
                    return ApplyOutcome::GapDetected { expected, got: *version };
                }
                self.last_applied = Some(*version);
                ApplyOutcome::Applied
            }
        }
    }

    /// Called once a fresh metadata image has been downloaded and
    /// applied at `version`, re-anchoring the sequence.
    pub fn reset_for_resync(&mut self, version: u64) {
        self.last_applied = Some(version);
    }

    /// The version a `REGISTER(rver=2, want_since_version)` should ask
    /// for: the next one after what's already applied, or `0` (from
    /// scratch) if nothing has been applied yet.
    pub fn want_since_version(&self) -> u64 {
        self.last_applied.map_or(0, |v| v + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(v: u64) -> StreamFrame {
        StreamFrame::Log { version: v, line: format!("{v}: 0|ACCESS():0") }
    }

    #[test]
    fn consecutive_versions_apply_cleanly() {
        let mut state = FollowerState::new(Some(9));
        assert_eq!(state.apply(&log(10)), ApplyOutcome::Applied);
        assert_eq!(state.apply(&log(11)), ApplyOutcome::Applied);
        assert_eq!(state.last_applied(), Some(11));
    }

    #[test]
    fn gap_is_detected_and_does_not_advance() {
        let mut state = FollowerState::new(Some(9));
        assert_eq!(state.apply(&log(12)), ApplyOutcome::GapDetected { expected: 10, got: 12 });
        assert_eq!(state.last_applied(), Some(9));
    }

    #[test]
    fn rotate_does_not_change_last_applied() {
        let mut state = FollowerState::new(Some(5));
        assert_eq!(state.apply(&StreamFrame::Rotate), ApplyOutcome::Rotated);
        assert_eq!(state.last_applied(), Some(5));
    }

    #[test]
    fn want_since_version_from_scratch_is_zero() {
        assert_eq!(FollowerState::new(None).want_since_version(), 0);
    }

    #[test]
    fn resync_reanchors_the_sequence() {
        let mut state = FollowerState::new(Some(9));
        state.apply(&log(50)); // gap, ignored
        state.reset_for_resync(100);
        assert_eq!(state.want_since_version(), 101);
    }
}
