//! Wall-clock implementation of [`Clock`].

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use super::{check_period, Clock, Ticker};
use crate::error::Result;

/// Clock backed by `SystemTime::now()` and tokio timers.
///
/// Creating a ticker spawns a task, so it must happen inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn ticker(&self, period: Duration) -> Result<Ticker> {
        check_period(period)?;
        let (tx, rx) = mpsc::channel(1);
        let driver = tokio::spawn(async move {
            let start = time::Instant::now() + period;
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = interval.tick() => {
                        // A full slot means the consumer lags; skip like a platform ticker.
                        let _ = tx.try_send(SystemTime::now());
                    }
                }
            }
        });
        Ok(Ticker::new(rx, Some(driver)))
    }
}
