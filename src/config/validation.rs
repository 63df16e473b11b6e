//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Validation is a pure
//! function that collects every problem instead of stopping at the first.

use std::net::SocketAddr;

use crate::config::schema::{ClusterOptions, Network};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no backend addresses configured")]
    NoAddresses,

    #[error("invalid address {addr:?}: {reason}")]
    InvalidAddress { addr: String, reason: &'static str },

    #[error("pool_size must be greater than zero")]
    ZeroPoolSize,

    #[error("db must not be negative (got {0})")]
    NegativeDb(i64),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Split a `host:port` address, rejecting anything without a host or a numeric port.
pub fn parse_tcp_addr(addr: &str) -> Result<(&str, u16), ValidationError> {
    let invalid = |reason| ValidationError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
    if port == 0 {
        return Err(invalid("port must not be zero"));
    }
    Ok((host, port))
}

/// Check a configuration, returning every problem found.
pub fn validate_config(config: &ClusterOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.addrs.is_empty() {
        errors.push(ValidationError::NoAddresses);
    }

    for addr in &config.addrs {
        match config.client.network {
            Network::Tcp => {
                if let Err(e) = parse_tcp_addr(addr) {
                    errors.push(e);
                }
            }
            Network::Unix => {
                if addr.trim().is_empty() {
                    errors.push(ValidationError::InvalidAddress {
                        addr: addr.clone(),
                        reason: "empty socket path",
                    });
                }
            }
        }
    }

    if config.client.pool_size == 0 {
        errors.push(ValidationError::ZeroPoolSize);
    }

    if config.client.db < 0 {
        errors.push(ValidationError::NegativeDb(config.client.db));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
