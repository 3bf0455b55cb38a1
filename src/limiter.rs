//! Fixed-window rate limiter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

/// Allows at most `max` passes per window; the count resets on every window tick.
#[derive(Debug)]
pub struct Limiter {
    max: u64,
    count: Arc<AtomicU64>,
    resetter: JoinHandle<()>,
}

impl Limiter {
    /// Creates a limiter on the system clock.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(window: Duration, max: u64) -> Result<Self> {
        Self::with_clock(window, max, &SystemClock::new())
    }

    /// Creates a limiter whose windows follow `clock`.
    ///
    /// Fails with [`Error::Config`] when `window` is zero.
    pub fn with_clock(window: Duration, max: u64, clock: &dyn Clock) -> Result<Self> {
        if window.is_zero() {
            return Err(Error::Config("limiter window must be positive".into()));
        }

        let count = Arc::new(AtomicU64::new(0));
        let mut ticker = clock.ticker(window)?;
        let window_count = Arc::clone(&count);
        let resetter = tokio::spawn(async move {
            while ticker.tick().await.is_some() {
                window_count.store(0, Ordering::Relaxed);
            }
        });

        Ok(Self {
            max,
            count,
            resetter,
        })
    }

    /// Counts one pass and returns whether it fits in the current window.
    pub fn pass(&self) -> bool {
        self.count.fetch_add(1, Ordering::Relaxed) < self.max
    }

    /// Stops resetting the window. Later passes are refused once `max` is used up.
    pub fn stop(&self) {
        self.resetter.abort();
    }
}

impl Drop for Limiter {
    fn drop(&mut self) {
        self.stop();
    }
}
