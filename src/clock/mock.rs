//! Virtual clock for deterministic tests and time-scaled simulations.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;

use super::{check_period, Clock, Ticker};
use crate::error::Result;

/// Clock whose time only moves when test code moves it.
///
/// Clones share the same time and tickers. Tickers fire inside [`MockClock::add`],
/// one period boundary at a time, yielding to the runtime around each firing.
/// On a current-thread runtime (the `#[tokio::test]` default) this lets the
/// task consuming a ticker observe every firing before time moves on.
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    now: SystemTime,
    tickers: Vec<MockTicker>,
}

#[derive(Debug)]
struct MockTicker {
    next: SystemTime,
    period: Duration,
    tx: mpsc::Sender<SystemTime>,
}

impl MockClock {
    /// Creates a mock clock set to the Unix epoch.
    pub fn new() -> Self {
        Self::at(SystemTime::UNIX_EPOCH)
    }

    /// Creates a mock clock set to `now`.
    pub fn at(now: SystemTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                now,
                tickers: Vec::new(),
            })),
        }
    }

    /// Moves the clock to `now` without firing tickers.
    ///
    /// Every ticker's next firing is rebased to one period after `now`.
    pub fn set(&self, now: SystemTime) {
        let mut state = self.lock();
        state.now = now;
        for ticker in &mut state.tickers {
            ticker.next = now + ticker.period;
        }
    }

    /// Advances the clock by `delta`, firing every ticker boundary crossed.
    pub async fn add(&self, delta: Duration) {
        let target = self.lock().now + delta;
        loop {
            tokio::task::yield_now().await;
            if !self.fire_next(target) {
                break;
            }
        }
        tokio::task::yield_now().await;
    }

    /// Fires the earliest ticker boundary at or before `target`.
    ///
    /// Returns false, after moving the clock to `target`, when none is left.
    fn fire_next(&self, target: SystemTime) -> bool {
        let mut state = self.lock();
        state.tickers.retain(|ticker| !ticker.tx.is_closed());

        let due = state
            .tickers
            .iter()
            .map(|ticker| ticker.next)
            .filter(|next| *next <= target)
            .min();

        match due {
            Some(at) => {
                state.now = at;
                for ticker in state.tickers.iter_mut().filter(|t| t.next == at) {
                    let _ = ticker.tx.try_send(at);
                    ticker.next = at + ticker.period;
                }
                true
            }
            None => {
                state.now = target;
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // The state holds no invariants a panicking holder could break.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        self.lock().now
    }

    fn ticker(&self, period: Duration) -> Result<Ticker> {
        check_period(period)?;
        let (tx, rx) = mpsc::channel(1);
        let mut state = self.lock();
        let next = state.now + period;
        state.tickers.push(MockTicker { next, period, tx });
        Ok(Ticker::new(rx, None))
    }
}
