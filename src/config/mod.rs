//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClusterOptions (validated, immutable)
//!     → instance_options() → one InstanceOptions per address
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the client is built
//! - All fields have defaults to allow minimal configs
//! - Out-of-range values that have an obvious meaning (check interval below
//!   100ms, rise/fall of zero, too many failover retries) are clamped, not rejected

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BalancerOptions, ClientOptions, ClusterOptions, FailoverOptions, InstanceOptions, LogFormat,
    Network, ObservabilityConfig, TlsOptions,
};
pub use validation::{validate_config, ValidationError};
