//! Pool of reusable one-shot timers.
//!
//! Saves an allocation per timeout on hot paths: take a timer with
//! [`get_timer`], await it (or not), and hand it back with [`put_timer`].
//!
//! Timers stay bound to the runtime that created them. A [`TimerPool`] must
//! not outlive or be shared across runtimes; the pool behind [`get_timer`]
//! is kept per thread and discarded once the runtime that filled it shuts
//! down. Two live runtimes driven alternately from one thread still share
//! that pool and should use their own [`TimerPool`].

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

/// Most idle timers a pool keeps; extra returns are dropped.
pub const MAX_IDLE_TIMERS: usize = 256;

thread_local! {
    static LOCAL_POOL: RefCell<Option<LocalPool>> = const { RefCell::new(None) };
}

/// Thread-local pool tied to the runtime it was filled under.
struct LocalPool {
    runtime: Weak<()>,
    pool: TimerPool,
}

impl LocalPool {
    fn new() -> Self {
        let alive = Arc::new(());
        let runtime = Arc::downgrade(&alive);
        // Holds the marker until the runtime drops its tasks at shutdown.
        tokio::spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        });
        Self {
            runtime,
            pool: TimerPool::new(),
        }
    }

    fn is_live(&self) -> bool {
        self.runtime.strong_count() > 0
    }
}

/// Takes a timer firing `d` from now from this thread's pool.
///
/// Must be called inside a tokio runtime.
pub fn get_timer(d: Duration) -> PooledTimer {
    LOCAL_POOL.with(|cell| {
        let mut slot = cell.borrow_mut();
        if !slot.as_ref().is_some_and(LocalPool::is_live) {
            *slot = None;
        }
        slot.get_or_insert_with(LocalPool::new).pool.get(d)
    })
}

/// Returns a timer to this thread's pool.
///
/// The timer is dropped when the pool's runtime is gone or the pool is full.
pub fn put_timer(timer: PooledTimer) {
    LOCAL_POOL.with(|cell| {
        if let Some(local) = cell.borrow().as_ref().filter(|l| l.is_live()) {
            local.pool.put(timer);
        }
    })
}

/// One-shot timer that can be re-armed and reused.
///
/// Awaiting takes `&mut`, so the timer survives its own completion.
#[derive(Debug)]
pub struct PooledTimer {
    sleep: Pin<Box<Sleep>>,
}

impl PooledTimer {
    /// Re-arms the timer to fire `d` from now.
    pub fn reset(&mut self, d: Duration) {
        self.sleep.as_mut().reset(Instant::now() + d);
    }

    /// Returns when the timer fires.
    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    /// Returns whether the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        self.sleep.is_elapsed()
    }
}

impl Future for PooledTimer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.sleep.as_mut().poll(cx)
    }
}

/// Pool of idle timers.
#[derive(Debug, Default)]
pub struct TimerPool {
    idle: Mutex<Vec<PooledTimer>>,
}

impl TimerPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an idle timer re-armed to `d`, or creates one.
    pub fn get(&self, d: Duration) -> PooledTimer {
        let reused = self.lock().pop();
        match reused {
            Some(mut timer) => {
                timer.reset(d);
                timer
            }
            None => PooledTimer {
                sleep: Box::pin(sleep(d)),
            },
        }
    }

    /// Returns `timer` to the pool, fired or not.
    ///
    /// Drops it instead once [`MAX_IDLE_TIMERS`] are idle.
    pub fn put(&self, timer: PooledTimer) {
        let mut idle = self.lock();
        if idle.len() < MAX_IDLE_TIMERS {
            idle.push(timer);
        }
    }

    /// Number of idle timers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no timer is idle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PooledTimer>> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner())
    }
}
