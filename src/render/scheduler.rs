//! Scroll coalescing scheduler
//!
//! A single debounced deadline. Every scroll reschedules it; the surface
//! runs the reconciliation blit once the deadline passes, or earlier when an
//! operation forces it. Time is passed in explicitly so hosts and tests can
//! drive it from their own clock.

use std::time::{Duration, Instant};

/// Default quiescent delay before a coalesced blit runs
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Debounced deadline for the deferred reconciliation blit
#[derive(Debug, Clone)]
pub struct ScrollScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for ScrollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_DELAY)
    }
}

impl ScrollScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)arm the deadline `delay` after `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any pending deadline
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Consume the deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
