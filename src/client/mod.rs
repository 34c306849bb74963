//! Client-side chunk I/O: the read locator/planner/executor and the
//! write chain/ring, per spec.md §4.4/§4.5.

pub mod executor;
pub mod locator;
pub mod planner;
pub mod write_chain;
pub mod write_ring;

pub use executor::Executor;
pub use locator::{ChunkLocation, ChunkLocator, PartLocation};
pub use planner::{plan, BlockSlot, Plan, PlanError, ReadOperation, XorBlockOperation};
pub use write_chain::WriteChain;
pub use write_ring::{WriteId, WriteRing};
