//! Timing utilities for histogram metrics.

use std::time::Instant;

use crate::Histogram;

/// Records elapsed wall-clock time into a histogram when dropped.
///
/// Create one at the top of the code path being measured; the observation
/// happens on every exit path, early returns and `?` included.
pub struct TimingGuard {
    histogram: &'static Histogram,
    start: Instant,
}

impl TimingGuard {
    pub fn new(histogram: &'static Histogram) -> Self {
        Self {
            histogram,
            start: Instant::now(),
        }
    }

    /// Seconds elapsed so far, without consuming the guard.
    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
