//! Round-robin selection policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::instance::Instance;
use crate::load_balancer::selector::Policy;

/// Round-robin selector.
/// Stores a shared counter to rotate through instances, skipping the ones
/// marked down. When every instance is down it rotates over all of them.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for RoundRobin {
    fn pick(&self, instances: &[Arc<Instance>]) -> usize {
        let len = instances.len();
        if len <= 1 {
            return 0;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        (0..len)
            .map(|i| start.wrapping_add(i) % len)
            .find(|&index| instances[index].is_up())
            .unwrap_or(start % len)
    }
}
