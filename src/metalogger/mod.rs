//! Metalogger change stream: the master's changelog ring and the
//! follower's gap-detection/resync state, per spec.md §4.7.
//!
//! A metalogger is an optional follower that registers with
//! `MLTOMA_REGISTER(rver=2, want_since_version)`, receives a stream of
//! [`stream::StreamFrame`]s, and falls back to a full metadata-image
//! [`download::DownloadSession`] whenever [`follower::FollowerState`]
//! detects a gap it can't bridge incrementally.

pub mod changelog;
pub mod download;
pub mod follower;
pub mod register;
pub mod stream;

pub use changelog::{ChangelogEntry, ChangelogRing};
pub use download::{DownloadSession, DownloadedChunk, FileNum};
pub use follower::{ApplyOutcome, FollowerState};
pub use register::{RegisterError, RegisterRequest};
pub use stream::{DiskChangelogReader, StreamFrame, StreamSource};
