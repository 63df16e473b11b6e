//! Configuration schema definitions.
//!
//! Every backend instance shares the same client settings; only the address
//! differs. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::health::HealthCheckSettings;
use crate::load_balancer::BalanceMode;

/// Lower bound for the health-check interval.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Failover retries used when none are configured (still clamped to the pool size).
pub const DEFAULT_FAILOVER_RETRIES: usize = 3;

/// Root configuration for a failover client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClusterOptions {
    /// Backend addresses: `host:port` for tcp, a socket path for unix.
    pub addrs: Vec<String>,

    /// Connection settings applied identically to every instance.
    pub client: ClientOptions,

    /// Health checking and selection policy.
    pub balancer: BalancerOptions,

    /// Retry limits for command dispatch.
    pub failover: FailoverOptions,

    /// Logging and metrics settings (used by the binary).
    pub observability: ObservabilityConfig,
}

impl ClusterOptions {
    /// Create options for the given addresses with every other setting defaulted.
    pub fn new<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addrs: addrs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// One `InstanceOptions` per configured address.
    pub fn instance_options(&self) -> Vec<InstanceOptions> {
        let health = self.balancer.health_settings();
        self.addrs
            .iter()
            .map(|addr| InstanceOptions {
                addr: addr.clone(),
                client: self.client.clone(),
                health,
            })
            .collect()
    }

    /// Failover retries after defaulting and clamping to the pool size.
    pub fn effective_failover_retries(&self) -> usize {
        self.failover.effective_retries(self.addrs.len())
    }
}

/// Network used to reach the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Tcp,
    Unix,
}

/// TLS settings. Presence of the section enables TLS.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsOptions {
    /// Skip certificate verification.
    pub insecure: bool,
}

/// Per-instance client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientOptions {
    pub network: Network,

    /// Optional password, must match the server's `requirepass`.
    pub password: Option<String>,

    /// Database selected after connecting.
    pub db: i64,

    pub dial_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,

    /// Maximum number of connections per instance.
    pub pool_size: usize,

    /// Wait for a free connection before failing. Defaults to read timeout + 1s.
    pub pool_timeout_ms: Option<u64>,

    /// Close connections idle for longer than this. Unset keeps them forever.
    pub idle_timeout_ms: Option<u64>,

    /// How often idle connections are reaped. 0 disables the reaper.
    pub idle_check_frequency_ms: u64,

    pub tls: Option<TlsOptions>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            password: None,
            db: 0,
            dial_timeout_ms: 5_000,
            read_timeout_ms: 3_000,
            write_timeout_ms: 3_000,
            pool_size: 10,
            pool_timeout_ms: None,
            idle_timeout_ms: None,
            idle_check_frequency_ms: 60_000,
            tls: None,
        }
    }
}

impl ClientOptions {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Deadline for a single command round trip.
    pub fn command_timeout(&self) -> Duration {
        self.write_timeout() + self.read_timeout()
    }

    pub fn pool_timeout(&self) -> Duration {
        match self.pool_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.read_timeout() + Duration::from_secs(1),
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn idle_check_frequency(&self) -> Option<Duration> {
        (self.idle_check_frequency_ms > 0)
            .then(|| Duration::from_millis(self.idle_check_frequency_ms))
    }
}

/// Health checking and selection policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerOptions {
    /// Probe interval in milliseconds, never below 100ms.
    pub check_interval_ms: u64,

    /// Consecutive successful probes required to mark an instance up.
    pub rise: usize,

    /// Consecutive failed probes required to mark an instance down.
    pub fall: usize,

    pub mode: BalanceMode,
}

impl Default for BalancerOptions {
    fn default() -> Self {
        Self {
            check_interval_ms: 1_000,
            rise: 1,
            fall: 1,
            mode: BalanceMode::RoundRobin,
        }
    }
}

impl BalancerOptions {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms).max(MIN_CHECK_INTERVAL)
    }

    pub fn health_settings(&self) -> HealthCheckSettings {
        HealthCheckSettings {
            interval: self.check_interval(),
            rise: self.rise.max(1),
            fall: self.fall.max(1),
        }
    }
}

/// Retry limits for command dispatch.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverOptions {
    /// Extra instances tried after the first one fails.
    pub failover_retries: Option<usize>,

    /// Extra attempts on the same instance before failing over.
    pub max_retries: usize,
}

impl FailoverOptions {
    /// Defaults to `min(3, pool_size)`; an explicit value is clamped to `pool_size`.
    pub fn effective_retries(&self, pool_size: usize) -> usize {
        self.failover_retries
            .unwrap_or(DEFAULT_FAILOVER_RETRIES)
            .min(pool_size)
    }
}

/// Settings for a single instance, derived from [`ClusterOptions`].
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub addr: String,
    pub client: ClientOptions,
    pub health: HealthCheckSettings,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
