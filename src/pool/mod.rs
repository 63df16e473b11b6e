//! Connection pooling subsystem.
//!
//! # Data Flow
//! ```text
//! execute(cmd)
//!     → checkout: wait for a slot (pool_timeout)
//!         → reuse idle connection (hit) or dial a new one (dial_timeout)
//!     → run command (write + read timeout)
//!     → return connection to idle list, or drop it on transport error
//! ```
//!
//! # Design Decisions
//! - One pool per instance, exclusively owned by that instance
//! - Wire protocol and connection setup are delegated to the `redis` crate
//! - Counters are atomics so stats never take the idle-list lock for long

pub mod conn_pool;
pub mod stats;

pub use conn_pool::{connection_url, ConnPool};
pub use stats::PoolStats;
