//! Wall-clock timestamps and monotonic timers.
//!
//! Wall-clock time is only ever used to label measurements. Every duration that ends up in a
//! measurement comes from a monotonic [`Instant`], so clock adjustments during a run cannot
//! distort the numbers.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A source of wall-clock timestamps and monotonic timers.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Starts a new monotonic timer.
    fn start_timer(&self) -> Timer {
        Timer::start()
    }
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A running monotonic timer.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    started: Instant,
}

impl Timer {
    /// Starts a timer at the current instant.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Stops the timer and returns the time elapsed since it was started.
    pub fn stop(self) -> Duration {
        self.started.elapsed()
    }
}

/// The moment a batch was initiated.
///
/// Captures one wall-clock reading together with a monotonic instant. Later timestamps within the
/// same batch are derived from the monotonic offset, so they can never precede the batch start.
#[derive(Clone, Copy, Debug)]
pub struct BatchEpoch {
    called_at: DateTime<Utc>,
    anchor: Instant,
}

impl BatchEpoch {
    /// Marks the start of a batch using the given clock.
    pub fn begin(clock: &dyn Clock) -> Self {
        Self {
            called_at: clock.now(),
            anchor: Instant::now(),
        }
    }

    /// The wall-clock time at which the batch was initiated.
    pub fn called_at(&self) -> DateTime<Utc> {
        self.called_at
    }

    /// The current wall-clock time, measured relative to the batch start.
    pub fn now(&self) -> DateTime<Utc> {
        let offset =
            chrono::Duration::from_std(self.anchor.elapsed()).unwrap_or(chrono::Duration::MAX);
        self.called_at
            .checked_add_signed(offset)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
