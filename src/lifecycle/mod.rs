//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (Balancer::new):
//!     Validate config → build instances → spawn health checkers
//!
//! Shutdown (Balancer::close):
//!     Trigger signal → stop health checkers → close every instance
//! ```
//!
//! # Design Decisions
//! - Fail fast: configuration errors surface before any task is spawned
//! - Close is idempotent; only the first call touches the instances
//! - In-flight commands are not drained, they may observe `Error::Closed`

pub mod shutdown;

pub use shutdown::Shutdown;
