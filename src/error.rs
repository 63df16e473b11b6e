//! Error types shared by every subsystem.

use crate::config::ConfigError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by instance handles and the failover client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server replied with nil, e.g. the key does not exist.
    ///
    /// This is a terminal outcome, never a reason to retry or fail over.
    #[error("redis: nil")]
    Nil,

    /// Error reported by the redis client (I/O, protocol or server error reply).
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    /// The command did not complete within the read + write deadline.
    #[error("command timed out")]
    Timeout,

    /// Establishing a new connection took longer than the dial timeout.
    #[error("dial {0}: timed out")]
    DialTimeout(String),

    /// Every pooled connection stayed busy for the whole pool timeout.
    #[error("connection pool timeout")]
    PoolTimeout,

    /// The handle has been closed.
    #[error("client is closed")]
    Closed,

    /// Background tasks need a Tokio runtime and none is running.
    #[error("no Tokio runtime running")]
    NoRuntime,

    /// A balancer cannot be built from an empty instance set.
    #[error("no instances configured")]
    NoInstances,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// True for the "no value" sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, Error::Nil)
    }
}
