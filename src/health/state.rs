//! Instance health state machine.
//!
//! # States
//! - Unknown: not probed yet, receives traffic
//! - Up: receives traffic
//! - Down: skipped by the selector while any other instance is up
//!
//! # State Transitions
//! ```text
//! Unknown/Up → Down: consecutive failures >= fall
//! Unknown/Down → Up: consecutive successes >= rise
//! ```
//!
//! A success always resets the failure streak and vice versa, so a single
//! contrary observation restarts the count.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Up,
            2 => HealthState::Down,
            _ => HealthState::Unknown,
        }
    }
}

/// Health counters of one instance.
///
/// Only the instance's own health checker records observations; readers
/// (the selector, stats) just load the state.
#[derive(Debug)]
pub struct Health {
    state: AtomicU8,
    consecutive_successes: AtomicUsize,
    consecutive_failures: AtomicUsize,
}

impl Default for Health {
    fn default() -> Self {
        Self::new()
    }
}

impl Health {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_successes: AtomicUsize::new(0),
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    /// Up or not yet probed.
    pub fn is_up(&self) -> bool {
        self.state() != HealthState::Down
    }

    pub fn consecutive_successes(&self) -> usize {
        self.consecutive_successes.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Record a successful probe. Returns the new state on a transition.
    pub fn record_success(&self, rise: usize) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;

        if successes >= rise && self.state() != HealthState::Up {
            self.state.store(HealthState::Up as u8, Ordering::Release);
            return Some(HealthState::Up);
        }
        None
    }

    /// Record a failed probe. Returns the new state on a transition.
    pub fn record_failure(&self, fall: usize) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

        if failures >= fall && self.state() != HealthState::Down {
            self.state.store(HealthState::Down as u8, Ordering::Release);
            return Some(HealthState::Down);
        }
        None
    }
}
