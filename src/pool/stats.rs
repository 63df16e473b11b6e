//! Connection pool counters.

use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Snapshot of a connection pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Connection checkouts requested.
    pub requests: u64,
    /// Checkouts served by an idle connection.
    pub hits: u64,
    /// Checkouts that gave up waiting for a free connection.
    pub timeouts: u64,
    /// Open connections, idle or in use.
    pub total_conns: u64,
    /// Idle connections.
    pub free_conns: u64,
}

impl Add for PoolStats {
    type Output = PoolStats;

    fn add(mut self, rhs: PoolStats) -> PoolStats {
        self += rhs;
        self
    }
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, rhs: PoolStats) {
        self.requests += rhs.requests;
        self.hits += rhs.hits;
        self.timeouts += rhs.timeouts;
        self.total_conns += rhs.total_conns;
        self.free_conns += rhs.free_conns;
    }
}

impl Sum for PoolStats {
    fn sum<I: Iterator<Item = PoolStats>>(iter: I) -> PoolStats {
        iter.fold(PoolStats::default(), Add::add)
    }
}
