//! Instance selection.
//!
//! # Responsibilities
//! - Hold the ordered instance set
//! - Apply the selection policy on every `next()`
//! - Always return an instance, even when all are down, so failover can proceed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::load_balancer::instance::Instance;
use crate::load_balancer::round_robin::RoundRobin;

/// Requested balancing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMode {
    #[default]
    RoundRobin,
    /// Not supported: proxies like twemproxy in front of the instances make
    /// connection counts meaningless. Falls back to round-robin.
    LeastConn,
}

/// A selection policy over a non-empty instance set.
pub trait Policy: Send + Sync + fmt::Debug {
    /// Index into `instances` of the instance to use. `instances` is never empty.
    fn pick(&self, instances: &[Arc<Instance>]) -> usize;
}

#[derive(Debug)]
pub struct Selector {
    instances: Vec<Arc<Instance>>,
    policy: Box<dyn Policy>,
    mode: BalanceMode,
}

impl Selector {
    pub fn new(instances: Vec<Arc<Instance>>, mode: BalanceMode) -> Result<Self> {
        if instances.is_empty() {
            return Err(Error::NoInstances);
        }

        let mode = match mode {
            BalanceMode::RoundRobin => BalanceMode::RoundRobin,
            BalanceMode::LeastConn => {
                tracing::warn!(
                    requested = ?mode,
                    "least_conn balancing is not supported, falling back to round_robin"
                );
                BalanceMode::RoundRobin
            }
        };

        Ok(Self {
            instances,
            policy: Box::new(RoundRobin::new()),
            mode,
        })
    }

    pub fn next(&self) -> Arc<Instance> {
        let index = self.policy.pick(&self.instances) % self.instances.len();
        self.instances[index].clone()
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    /// The mode actually in effect.
    pub fn mode(&self) -> BalanceMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
