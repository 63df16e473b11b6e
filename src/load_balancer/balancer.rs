//! Instance pool management.
//!
//! # Responsibilities
//! - Build one instance (pool + health state) per configured address
//! - Run one health checker per instance
//! - Hand out instances through the selector
//! - Shut everything down exactly once

use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::InstanceOptions;
use crate::error::{Error, Result};
use crate::health::{HealthCheckSettings, HealthChecker};
use crate::lifecycle::Shutdown;
use crate::load_balancer::instance::Instance;
use crate::load_balancer::selector::{BalanceMode, Selector};

/// Owns the instance set and its health checkers.
#[derive(Debug)]
pub struct Balancer {
    selector: Selector,
    shutdown: Shutdown,
    checkers: Mutex<Vec<JoinHandle<()>>>,
}

impl Balancer {
    /// Create one pooled instance per config and start their health checkers.
    ///
    /// No connection is opened here; a malformed address fails before any
    /// task is spawned.
    pub fn new(configs: Vec<InstanceOptions>, mode: BalanceMode) -> Result<Self> {
        let members = configs
            .iter()
            .map(|options| Ok((Arc::new(Instance::connect(options)?), options.health)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_instances(members, mode)
    }

    /// Build a balancer over existing instances.
    ///
    /// Fails with [`Error::NoRuntime`] outside of a Tokio runtime.
    pub fn from_instances(
        members: Vec<(Arc<Instance>, HealthCheckSettings)>,
        mode: BalanceMode,
    ) -> Result<Self> {
        Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let (instances, settings): (Vec<_>, Vec<_>) = members.into_iter().unzip();
        let selector = Selector::new(instances, mode)?;
        let shutdown = Shutdown::new();

        let checkers = selector
            .instances()
            .iter()
            .zip(settings)
            .map(|(instance, settings)| {
                HealthChecker::new(instance.clone(), settings).spawn(shutdown.subscribe())
            })
            .collect();

        tracing::info!(
            instances = selector.len(),
            mode = ?selector.mode(),
            "balancer started"
        );

        Ok(Self {
            selector,
            shutdown,
            checkers: Mutex::new(checkers),
        })
    }

    /// Pick the instance for the next command.
    pub fn next(&self) -> Arc<Instance> {
        self.selector.next()
    }

    /// Every instance, in configuration order.
    pub fn instances(&self) -> &[Arc<Instance>] {
        self.selector.instances()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Balancing mode in effect.
    pub fn mode(&self) -> BalanceMode {
        self.selector.mode()
    }

    pub fn len(&self) -> usize {
        self.selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selector.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Health checkers still holding the shutdown signal.
    pub fn active_checkers(&self) -> usize {
        self.shutdown.receiver_count()
    }

    /// Stop every health checker and close every instance.
    ///
    /// All instances are closed even if some fail; the first error is
    /// returned. Calling `close` again is a no-op returning `Ok(())`.
    pub fn close(&self) -> Result<()> {
        if !self.shutdown.trigger() {
            return Ok(());
        }
        tracing::debug!(checkers = self.active_checkers(), "stopping health checkers");
        self.stop_checkers();

        let mut first_err = None;
        for instance in self.selector.instances() {
            if let Err(e) = instance.client().close() {
                tracing::warn!(addr = %instance.addr(), error = %e, "failed to close instance");
                first_err.get_or_insert(e);
            }
        }

        tracing::info!(instances = self.selector.len(), "balancer closed");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stop_checkers(&self) {
        let mut checkers = self.checkers.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in checkers.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Balancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.stop_checkers();
    }
}
