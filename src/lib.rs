//! Client-side load balancing and failover for standalone redis instances.
//!
//! Several redis servers sharing one configuration (but not forming a
//! cluster) are used as interchangeable alternates: every command goes to an
//! instance picked round-robin among the healthy ones, and is retried on the
//! same instance and then on other instances when it fails.
//!
//! ```rust,no_run
//! use xredis::{ClusterOptions, Commands, FailoverClient};
//!
//! # async fn example() -> xredis::Result<()> {
//! let client = FailoverClient::new(&ClusterOptions::new([
//!     "127.0.0.1:6379",
//!     "127.0.0.1:6380",
//!     "127.0.0.1:6381",
//! ]))?;
//!
//! client.set("greeting", "hello").await?;
//! let value: Option<String> = client.get("greeting").await?;
//! assert_eq!(value.as_deref(), Some("hello"));
//!
//! client.close()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod pool;

#[cfg(test)]
mod testing;

pub use client::{BoundPipeline, CommandExecutor, Commands, FailoverClient};
pub use config::ClusterOptions;
pub use error::{Error, Result};
pub use load_balancer::{BalanceMode, Balancer, Instance};
pub use pool::PoolStats;
