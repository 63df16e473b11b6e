//! Command dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Application command
//!     → commands.rs (typed helper builds a redis::Cmd)
//!     → failover.rs (FailoverClient::process)
//!         → Balancer::next() picks an instance
//!         → instance handle executes (retry same instance up to max_retries)
//!         → on error, next instance (up to failover_retries)
//!     → reply, nil sentinel, or the last error
//! ```
//!
//! # Design Decisions
//! - `CommandExecutor` is the seam between dispatch and connection handling
//! - Nil is a result, not a failure: it is returned immediately
//! - Pipelines are pinned to one instance

pub mod commands;
pub mod executor;
pub mod failover;
pub mod pipeline;

pub use commands::Commands;
pub use executor::CommandExecutor;
pub use failover::FailoverClient;
pub use pipeline::BoundPipeline;
