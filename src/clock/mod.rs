//! Clock abstraction for the dull ticker.
//!
//! Supports the platform clock and a virtual clock that tests advance by hand.

mod mock;
mod system;

pub use mock::MockClock;
pub use system::SystemClock;

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Source of the current time and of periodic poll tickers.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> SystemTime;

    /// Creates a ticker firing every `period` until stopped or dropped.
    ///
    /// Fails with [`Error::Config`] when `period` is zero.
    fn ticker(&self, period: Duration) -> Result<Ticker>;
}

/// Rejects periods a ticker cannot fire on.
pub(crate) fn check_period(period: Duration) -> Result<()> {
    if period.is_zero() {
        return Err(Error::Config("ticker period must be positive".into()));
    }
    Ok(())
}

/// Periodic source of timestamps created by a [`Clock`].
///
/// Delivery is lossy: at most one undelivered timestamp is kept, and
/// firings that happen while it is pending are skipped.
#[derive(Debug)]
pub struct Ticker {
    rx: mpsc::Receiver<SystemTime>,
    driver: Option<JoinHandle<()>>,
}

impl Ticker {
    pub(crate) fn new(rx: mpsc::Receiver<SystemTime>, driver: Option<JoinHandle<()>>) -> Self {
        Self { rx, driver }
    }

    /// Waits for the next firing.
    ///
    /// Returns `None` once the ticker has been stopped.
    pub async fn tick(&mut self) -> Option<SystemTime> {
        self.rx.recv().await
    }

    /// Stops the ticker. No further firings are delivered.
    pub fn stop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.rx.close();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
