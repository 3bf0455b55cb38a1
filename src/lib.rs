//! Dull ticker - an adaptive, coalescing notifier
//!
//! Turns a stream of activity "touches" into a throttled stream of ticks:
//! the tick interval grows while activity continues and snaps back to the
//! minimum after a quiet period. Also ships the small timing utilities that
//! usually sit next to it: a duration parser, a fixed-window rate limiter
//! and a reusable timer pool.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod limiter;
pub mod pool;
pub mod state;
pub mod ticker;

pub use backoff::{doubling, Backoff, BackoffFn};
pub use clock::{Clock, MockClock, SystemClock, Ticker};
pub use config::{
    DullConfig, Validate, ValidationResult, DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL,
    DEFAULT_RESET_DURATION,
};
pub use duration::{format_duration, parse_duration, parse_positive_duration};
pub use error::{Error, Result};
pub use limiter::Limiter;
pub use pool::{get_timer, put_timer, PooledTimer, TimerPool, MAX_IDLE_TIMERS};
pub use state::{DullState, Snapshot, TickReason};
pub use ticker::{DullTicker, DullTickerBuilder, Ticks};
