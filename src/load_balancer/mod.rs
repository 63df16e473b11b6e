//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Command issued
//!     → balancer.rs (owns instances + health checkers)
//!     → selector.rs (apply policy):
//!         - round_robin.rs (rotate through instances that are up)
//!     → instance.rs (the chosen instance's connection pool)
//! ```
//!
//! # Design Decisions
//! - Instances are interchangeable; no sharding or key hashing
//! - Down instances are skipped, but selection never fails: with every
//!   instance down it degrades to plain rotation so failover can still try them
//! - `least_conn` is accepted in config but falls back to round-robin

pub mod balancer;
pub mod instance;
pub mod round_robin;
pub mod selector;

pub use balancer::Balancer;
pub use instance::Instance;
pub use selector::{BalanceMode, Policy, Selector};
