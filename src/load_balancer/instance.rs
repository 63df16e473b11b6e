//! Instance abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Own that server's command handle (normally a [`ConnPool`])
//! - Carry the health state its checker maintains

use std::fmt;
use std::sync::Arc;

use crate::client::CommandExecutor;
use crate::config::InstanceOptions;
use crate::error::Result;
use crate::health::Health;
use crate::pool::{ConnPool, PoolStats};

/// One backend server of the pool.
pub struct Instance {
    addr: String,
    client: Arc<dyn CommandExecutor>,
    health: Health,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("addr", &self.addr)
            .field("state", &self.health.state())
            .finish()
    }
}

impl Instance {
    /// Wrap an existing handle.
    pub fn new(addr: impl Into<String>, client: Arc<dyn CommandExecutor>) -> Self {
        Self {
            addr: addr.into(),
            client,
            health: Health::new(),
        }
    }

    /// Create an instance backed by its own connection pool.
    pub fn connect(options: &InstanceOptions) -> Result<Self> {
        let pool = ConnPool::new(options)?;
        Ok(Self::new(options.addr.clone(), pool))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The handle commands for this instance run on.
    pub fn client(&self) -> &Arc<dyn CommandExecutor> {
        &self.client
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn is_up(&self) -> bool {
        self.health.is_up()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.client.pool_stats()
    }
}
