//! Metrics collection and exposition.
//!
//! # Metrics
//! - `xredis_commands_total` (counter): finished commands by outcome (ok, nil, error)
//! - `xredis_retries_total` (counter): same-instance retries
//! - `xredis_failovers_total` (counter): switches to another instance
//! - `xredis_health_checks_total` (counter): probes by instance and result
//! - `xredis_instance_up` (gauge): 1=up, 0=down, per instance
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, e.g. by [`init_metrics`].

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Outcome of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok,
    Nil,
    Error,
}

impl CommandOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CommandOutcome::Ok => "ok",
            CommandOutcome::Nil => "nil",
            CommandOutcome::Error => "error",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "failed to install metrics exporter"),
    }
}

pub fn record_command(outcome: CommandOutcome) {
    metrics::counter!("xredis_commands_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_retry() {
    metrics::counter!("xredis_retries_total").increment(1);
}

pub fn record_failover() {
    metrics::counter!("xredis_failovers_total").increment(1);
}

pub fn record_health_check(addr: &str, ok: bool) {
    let result = if ok { "ok" } else { "fail" };
    metrics::counter!(
        "xredis_health_checks_total",
        "addr" => addr.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_instance_health(addr: &str, up: bool) {
    metrics::gauge!("xredis_instance_up", "addr" => addr.to_string()).set(if up { 1.0 } else { 0.0 });
}
