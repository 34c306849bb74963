//! Connection manager: the single-connection reactor, its staged-read
//! state machine, and the pooled-connection cache shared by the read
//! executor and write chain.

pub mod connection;
pub mod pool;
pub mod reactor;

pub use connection::{Connection, Mode};
pub use pool::ConnectionPool;
pub use reactor::{run, PeerRole};
