//! The command execution seam.
//!
//! A `CommandExecutor` runs commands against "something that talks to redis":
//! a single instance's connection pool, or the failover client spreading
//! commands over many instances. Everything above this trait (typed
//! commands, health probes, stats aggregation) works with either.

use async_trait::async_trait;
use redis::{Cmd, Pipeline, Value};

use crate::error::Result;
use crate::pool::PoolStats;

#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    /// Run one command.
    ///
    /// A nil reply is reported as [`Error::Nil`](crate::Error::Nil).
    async fn execute(&self, cmd: &Cmd) -> Result<Value>;

    /// Run a batch of commands over a single connection.
    async fn execute_pipeline(&self, pipe: &Pipeline) -> Result<Vec<Value>>;

    /// Lightweight liveness check.
    async fn probe(&self) -> Result<()> {
        self.execute(&redis::cmd("PING")).await.map(|_| ())
    }

    /// Connection pool counters.
    fn pool_stats(&self) -> PoolStats;

    /// Release every connection. Later calls fail with [`Error::Closed`](crate::Error::Closed).
    fn close(&self) -> Result<()>;
}
