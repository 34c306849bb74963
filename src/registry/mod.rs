//! Master-side chunk registry: per-chunk state, the operation state
//! machine, destination selection policy, the health/classification
//! scan, and the client session table.

pub mod chunk;
pub mod health;
pub mod ops;
pub mod selection;
pub mod session;

pub use chunk::{Chunk, Copy, CopyState, LockMode};
pub use ops::{ChunkRegistry, OpKind, OpOutcome, PendingOp};
pub use selection::{select_ordered, select_weighted, ServerLoad, WeightedSelectionState};
pub use session::{Session, SessionFlags, SessionId, SessionTable};
