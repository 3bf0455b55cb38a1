//! The dull ticker: an adaptive, coalescing notifier.
//!
//! Every [`DullTicker::touch`] arms the ticker. A background task polls the
//! clock and emits a tick once either the current step interval has passed
//! since the last tick, or the pending touch has waited the full reset
//! duration. Step ticks grow the interval through the backoff function;
//! idle ticks restart it from the minimum. Under sustained activity the
//! ticker becomes more and more dull, and it wakes up again after a pause.
//!
//! Ticks land in a single-slot mailbox. A tick emitted while the previous
//! one is still unread is dropped.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::backoff::{doubling, Backoff, BackoffFn};
use crate::clock::{Clock, SystemClock, Ticker};
use crate::config::{DullConfig, Validate};
use crate::error::{Error, Result};
use crate::state::{DullState, Snapshot};

/// Commands queued before callers have to wait for the loop.
const COMMAND_BUFFER: usize = 1;

enum Command {
    Touch,
    Reset,
    Snapshot(oneshot::Sender<Snapshot>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Touch => f.write_str("Touch"),
            Command::Reset => f.write_str("Reset"),
            Command::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}

/// Builder for a [`DullTicker`]. Setters may be repeated; the last call wins.
pub struct DullTickerBuilder {
    config: DullConfig,
    backoff: BackoffFn,
    clock: Arc<dyn Clock>,
}

impl Default for DullTickerBuilder {
    fn default() -> Self {
        Self {
            config: DullConfig::default(),
            backoff: Arc::new(doubling),
            clock: Arc::new(SystemClock::new()),
        }
    }
}

impl DullTickerBuilder {
    /// Sets all durations from `config`.
    pub fn config(mut self, config: &DullConfig) -> Self {
        self.config = *config;
        self
    }

    /// Sets the floor of the step interval.
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.config.min_interval = interval;
        self
    }

    /// Sets the ceiling of the step interval; zero means unbounded.
    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.config.max_interval = interval;
        self
    }

    /// Sets how long a touch may stay pending before it is flushed.
    pub fn reset_duration(mut self, reset: Duration) -> Self {
        self.config.reset_duration = reset;
        self
    }

    /// Sets the function computing the next step interval.
    ///
    /// Results outside `[min_interval, max_interval]` are clamped.
    pub fn backoff<F>(mut self, next: F) -> Self
    where
        F: Fn(Duration) -> Duration + Send + Sync + 'static,
    {
        self.backoff = Arc::new(next);
        self
    }

    /// Sets the clock, typically a [`crate::MockClock`] in tests.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validates the configuration and starts the ticker loop.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(self) -> Result<(DullTicker, Ticks)> {
        let warnings = self.config.validate().into_result()?;
        for warning in &warnings {
            tracing::warn!(warning = %warning, "questionable dull ticker config");
        }

        let config = self.config;
        let backoff = Backoff::new(config.min_interval, config.max_interval, self.backoff);
        let state = DullState::new(backoff, config.reset_duration);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Created before spawning so the first poll is measured from now.
        let ticker = self.clock.ticker(config.poll_period())?;

        let event_loop = EventLoop {
            state,
            clock: self.clock,
            ticker,
            commands: command_rx,
            shutdown: shutdown_rx,
            ticks: tick_tx,
        };
        tokio::spawn(event_loop.run(config));

        let handle = DullTicker {
            commands: command_tx,
            shutdown: Arc::new(shutdown_tx),
        };
        Ok((handle, Ticks { rx: tick_rx }))
    }
}

/// Handle to a running dull ticker.
///
/// Clones drive the same ticker. The loop exits on [`DullTicker::stop`] or
/// once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct DullTicker {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl DullTicker {
    /// Returns a builder with the default configuration.
    pub fn builder() -> DullTickerBuilder {
        DullTickerBuilder::default()
    }

    /// Spawns a ticker with `config` on the system clock.
    pub fn spawn(config: &DullConfig) -> Result<(Self, Ticks)> {
        Self::builder().config(config).spawn()
    }

    /// Records activity now, arming the ticker.
    ///
    /// Waits only until the loop has accepted the command. Fails with
    /// [`Error::Stopped`] once the ticker is stopped; a touch racing with
    /// [`DullTicker::stop`] may be accepted and then discarded.
    pub async fn touch(&self) -> Result<()> {
        self.send(Command::Touch).await
    }

    /// Returns the ticker to its unarmed, minimum-interval state.
    ///
    /// Pending activity is discarded, but a tick already waiting in
    /// [`Ticks`] stays there. Fails like [`DullTicker::touch`].
    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    /// Returns a copy of the loop's current state.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Stops the ticker. Safe to call any number of times.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns whether [`DullTicker::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn send(&self, command: Command) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::Stopped);
        }
        self.commands.send(command).await.map_err(|_| Error::Stopped)
    }
}

/// Receiving end of a dull ticker's output.
#[derive(Debug)]
pub struct Ticks {
    rx: mpsc::Receiver<SystemTime>,
}

impl Ticks {
    /// Waits for the next tick.
    ///
    /// Returns `None` once the ticker has stopped and the last tick was read.
    pub async fn recv(&mut self) -> Option<SystemTime> {
        self.rx.recv().await
    }

    /// Takes the pending tick, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<SystemTime> {
        self.rx.try_recv().ok()
    }
}

/// State owned by the background task.
struct EventLoop {
    state: DullState,
    clock: Arc<dyn Clock>,
    ticker: Ticker,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
    ticks: mpsc::Sender<SystemTime>,
}

impl EventLoop {
    async fn run(mut self, config: DullConfig) {
        tracing::info!(
            min_interval = ?config.min_interval,
            max_interval = ?config.max_interval,
            reset_duration = ?config.reset_duration,
            poll = ?config.poll_period(),
            "dull ticker started"
        );

        loop {
            tokio::select! {
                biased;

                // A closed channel means every handle is gone.
                _ = self.shutdown.changed() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                now = self.ticker.tick() => match now {
                    Some(now) => self.poll(now),
                    None => break,
                },
            }
        }

        self.ticker.stop();
        tracing::info!("dull ticker stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Touch => self.state.touch(self.clock.now()),
            Command::Reset => {
                self.state.reset();
                tracing::debug!("dull ticker reset");
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn poll(&mut self, now: SystemTime) {
        let Some(reason) = self.state.poll(now) else {
            return;
        };

        match self.ticks.try_send(now) {
            Ok(()) => {
                tracing::debug!(reason = ?reason, interval = ?self.state.interval(), "dull tick");
            }
            Err(TrySendError::Full(_)) => {
                tracing::trace!(reason = ?reason, "previous tick unread, dropping");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(reason = ?reason, "no tick receiver");
            }
        }
    }
}
