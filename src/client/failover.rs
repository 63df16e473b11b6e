//! Failover command dispatch.
//!
//! # Responsibilities
//! - Run each command on an instance chosen by the balancer
//! - Retry on the same instance up to `max_retries` times
//! - Fail over to the next instance up to `failover_retries` times
//! - Treat a nil reply as a finished command, never as a failure
//!
//! # Design Decisions
//! - The last error is returned as is once both retry layers are exhausted
//! - Pipelines run on one instance without failover (see `pipeline.rs`)
//! - The client is a cheap handle; clones share the same balancer

use async_trait::async_trait;
use redis::{Cmd, Pipeline, Value};
use std::sync::Arc;

use crate::client::executor::CommandExecutor;
use crate::client::pipeline::BoundPipeline;
use crate::config::{validate_config, ClusterOptions, ConfigError, FailoverOptions};
use crate::error::{Error, Result};
use crate::load_balancer::{Balancer, Instance};
use crate::observability::metrics::{self, CommandOutcome};
use crate::pool::PoolStats;

/// Command façade over a pool of interchangeable instances.
#[derive(Debug, Clone)]
pub struct FailoverClient {
    balancer: Arc<Balancer>,
    failover_retries: usize,
    max_retries: usize,
}

impl FailoverClient {
    /// Validate `options`, build the instance pool and start health checking.
    ///
    /// Health checking runs on the current Tokio runtime; without one this
    /// fails with [`Error::NoRuntime`].
    pub fn new(options: &ClusterOptions) -> Result<Self> {
        validate_config(options).map_err(ConfigError::Validation)?;
        let balancer = Balancer::new(options.instance_options(), options.balancer.mode)?;
        Ok(Self::with_balancer(Arc::new(balancer), &options.failover))
    }

    /// Dispatch over an existing balancer.
    ///
    /// `failover_retries` is defaulted and clamped to the balancer's size.
    pub fn with_balancer(balancer: Arc<Balancer>, failover: &FailoverOptions) -> Self {
        let failover_retries = failover.effective_retries(balancer.len());
        Self {
            balancer,
            failover_retries,
            max_retries: failover.max_retries,
        }
    }

    /// Extra instances tried after the first one.
    pub fn failover_retries(&self) -> usize {
        self.failover_retries
    }

    /// Extra attempts on each instance.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn balancer(&self) -> &Arc<Balancer> {
        &self.balancer
    }

    /// A fixed instance, for command sequences that must stay on one server.
    pub fn next(&self) -> Arc<Instance> {
        self.balancer.next()
    }

    /// Run `cmd`, retrying and failing over as configured.
    pub async fn process(&self, cmd: &Cmd) -> Result<Value> {
        if self.balancer.is_closed() {
            return Err(Error::Closed);
        }

        let mut last_err = None;
        for attempt in 0..=self.failover_retries {
            let instance = self.balancer.next();
            if attempt > 0 {
                metrics::record_failover();
                tracing::debug!(addr = %instance.addr(), attempt, "failing over");
            }

            for retry in 0..=self.max_retries {
                if retry > 0 {
                    metrics::record_retry();
                }
                match instance.client().execute(cmd).await {
                    Ok(value) => {
                        metrics::record_command(CommandOutcome::Ok);
                        return Ok(value);
                    }
                    Err(Error::Nil) => {
                        metrics::record_command(CommandOutcome::Nil);
                        return Err(Error::Nil);
                    }
                    Err(e) => {
                        tracing::debug!(
                            addr = %instance.addr(),
                            attempt,
                            retry,
                            error = %e,
                            "command failed"
                        );
                        last_err = Some(e);
                    }
                }
            }
        }

        metrics::record_command(CommandOutcome::Error);
        let err = last_err.unwrap_or(Error::NoInstances);
        tracing::warn!(
            attempts = (self.failover_retries + 1) * (self.max_retries + 1),
            error = %err,
            "command failed on every attempt"
        );
        Err(err)
    }

    /// Connection pool counters summed over every instance.
    pub fn pool_stats(&self) -> PoolStats {
        self.balancer
            .instances()
            .iter()
            .map(|instance| instance.pool_stats())
            .sum()
    }

    /// Start a pipeline bound to the next instance.
    pub fn pipeline(&self) -> BoundPipeline {
        BoundPipeline::new(self.balancer.next())
    }

    /// Build a pipeline with `f` and run it on the next instance.
    pub async fn pipelined<F>(&self, f: F) -> Result<Vec<Value>>
    where
        F: FnOnce(&mut Pipeline),
    {
        let mut pipe = self.pipeline();
        f(&mut pipe);
        pipe.exec().await
    }

    /// Stop health checking and close every instance. Safe to call twice.
    pub fn close(&self) -> Result<()> {
        self.balancer.close()
    }
}

#[async_trait]
impl CommandExecutor for FailoverClient {
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        self.process(cmd).await
    }

    async fn execute_pipeline(&self, pipe: &Pipeline) -> Result<Vec<Value>> {
        self.balancer.next().client().execute_pipeline(pipe).await
    }

    fn pool_stats(&self) -> PoolStats {
        FailoverClient::pool_stats(self)
    }

    fn close(&self) -> Result<()> {
        self.balancer.close()
    }
}
