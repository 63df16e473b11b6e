//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! checker.rs (one task per instance):
//!     Periodic timer
//!     → probe the instance (PING on a dedicated connection)
//!     → update state.rs
//!
//! state.rs:
//!     Up ←→ Down
//!     With rise/fall thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Health state is per-instance and written only by that instance's checker
//! - Probe failures never reach command callers
//! - Checkers stop on the balancer's shutdown signal

pub mod checker;
pub mod state;

pub use checker::{HealthCheckSettings, HealthChecker};
pub use state::{Health, HealthState};
