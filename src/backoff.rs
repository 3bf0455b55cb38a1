//! Bounded backoff for the dull ticker's step interval.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Function computing the next step interval from the current one.
pub type BackoffFn = Arc<dyn Fn(Duration) -> Duration + Send + Sync>;

/// Doubles the given interval, saturating at `Duration::MAX`.
pub fn doubling(interval: Duration) -> Duration {
    interval.saturating_mul(2)
}

/// Backoff driven by a custom function, clamped to `[min, max]`.
///
/// A `max` of zero means the interval is unbounded above.
#[derive(Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
    next: BackoffFn,
}

impl Backoff {
    /// Creates a new backoff starting at `min`.
    pub fn new(min: Duration, max: Duration, next: BackoffFn) -> Self {
        Self {
            min,
            max,
            current: min,
            next,
        }
    }

    /// Creates a doubling backoff starting at `min`, capping at `max`.
    pub fn doubling(min: Duration, max: Duration) -> Self {
        Self::new(min, max, Arc::new(doubling))
    }

    /// Returns the current interval.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Advances to the next interval through the backoff function.
    pub fn next(&mut self) {
        self.current = self.clamp((self.next)(self.current));
    }

    /// Resets the interval to `min`.
    pub fn reset(&mut self) {
        self.current = self.min;
    }

    fn clamp(&self, interval: Duration) -> Duration {
        let mut interval = interval;
        if !self.max.is_zero() && interval > self.max {
            interval = self.max;
        }
        if interval < self.min {
            interval = self.min;
        }
        interval
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
