//! Decision state of a dull ticker.
//!
//! Tracks the pending touch, the last emitted tick and the current step
//! interval, and decides on every poll whether a tick is due.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;

/// Why a tick was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickReason {
    /// The pending touch stayed unflushed for the whole reset duration.
    Idle,
    /// The current step interval elapsed since the last tick.
    Step,
}

/// Point-in-time copy of a ticker's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current step interval.
    pub interval: Duration,
    /// Time of the last emitted tick, if any since the last reset.
    pub last_tick: Option<SystemTime>,
    /// Time of the pending touch, if any.
    pub last_touch: Option<SystemTime>,
}

/// State machine behind a dull ticker.
#[derive(Debug, Clone)]
pub struct DullState {
    backoff: Backoff,
    reset_duration: Duration,
    last_tick: Option<SystemTime>,
    last_touch: Option<SystemTime>,
}

impl DullState {
    /// Creates an unarmed state.
    pub fn new(backoff: Backoff, reset_duration: Duration) -> Self {
        Self {
            backoff,
            reset_duration,
            last_tick: None,
            last_touch: None,
        }
    }

    /// Records activity at `now`.
    pub fn touch(&mut self, now: SystemTime) {
        self.last_touch = Some(now);
    }

    /// Returns to the unarmed, minimum-interval state.
    pub fn reset(&mut self) {
        self.backoff.reset();
        self.last_tick = None;
        self.last_touch = None;
    }

    /// Evaluates the poll at `now`.
    ///
    /// Returns the reason when a tick is due; the caller emits `now`.
    pub fn poll(&mut self, now: SystemTime) -> Option<TickReason> {
        let touched = self.last_touch?;

        let reach_reset = passed(now, touched, self.reset_duration);
        let reach_step = match self.last_tick {
            Some(tick) => passed(now, tick, self.backoff.current()),
            None => true,
        };
        if !reach_reset && !reach_step {
            return None;
        }

        let reason = if reach_reset {
            self.backoff.reset();
            TickReason::Idle
        } else {
            self.backoff.next();
            TickReason::Step
        };

        self.last_tick = Some(now);
        self.last_touch = None;
        Some(reason)
    }

    /// Returns the current step interval.
    pub fn interval(&self) -> Duration {
        self.backoff.current()
    }

    /// Returns whether a touch is waiting to be flushed.
    pub fn is_armed(&self) -> bool {
        self.last_touch.is_some()
    }

    /// Copies the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            interval: self.backoff.current(),
            last_tick: self.last_tick,
            last_touch: self.last_touch,
        }
    }
}

/// Strictly after `since + wait`; a deadline past the end of time never passes.
fn passed(now: SystemTime, since: SystemTime, wait: Duration) -> bool {
    since.checked_add(wait).is_some_and(|deadline| now > deadline)
}
