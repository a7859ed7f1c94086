//! Timestamp utilities
//!
//! Host event timestamps are seconds on a monotonic clock whose origin is the
//! moment the clock was created, in the manner of a page's `performance.now()`.

use std::time::{Duration, Instant};

/// Monotonic clock reporting seconds since its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created.
    pub fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
