//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe one instance
//! - Feed probe results into that instance's health state

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::state::HealthState;
use crate::load_balancer::Instance;
use crate::observability::metrics;

/// Probe interval and hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckSettings {
    pub interval: Duration,
    /// Consecutive successes before an instance is marked up.
    pub rise: usize,
    /// Consecutive failures before an instance is marked down.
    pub fall: usize,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            rise: 1,
            fall: 1,
        }
    }
}

/// Background prober for a single instance.
pub struct HealthChecker {
    instance: Arc<Instance>,
    settings: HealthCheckSettings,
}

impl HealthChecker {
    pub fn new(instance: Arc<Instance>, settings: HealthCheckSettings) -> Self {
        Self { instance, settings }
    }

    /// Run the checker on the current Tokio runtime until `shutdown` fires.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(
            addr = %self.instance.addr(),
            interval_ms = self.settings.interval.as_millis() as u64,
            rise = self.settings.rise,
            fall = self.settings.fall,
            "health checker starting"
        );

        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(addr = %self.instance.addr(), "health checker stopped");
                    break;
                }
            }
        }
    }

    /// Probe once and record the outcome. Returns whether the probe succeeded.
    pub async fn check_once(&self) -> bool {
        let addr = self.instance.addr();
        let health = self.instance.health();

        let ok = match self.instance.client().probe().await {
            Ok(()) => {
                if let Some(HealthState::Up) = health.record_success(self.settings.rise) {
                    tracing::info!(addr = %addr, "instance is up");
                }
                true
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "health probe failed");
                if let Some(HealthState::Down) = health.record_failure(self.settings.fall) {
                    tracing::warn!(
                        addr = %addr,
                        failures = health.consecutive_failures(),
                        error = %e,
                        "instance is down"
                    );
                }
                false
            }
        };

        metrics::record_health_check(addr, ok);
        metrics::record_instance_health(addr, health.is_up());
        ok
    }
}
