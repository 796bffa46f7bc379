//! Wall-clock sources for the countdown.
//!
//! The countdown compares a server-issued *absolute* instant with "now",
//! so it needs wall-clock time, not a monotonic `Instant`. Putting the
//! clock behind a trait lets tests drive time by hand.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant as TokioInstant;

/// A source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock read once, then advanced by Tokio's monotonic clock.
///
/// Immune to wall-clock jumps after construction, and under
/// `tokio::time::pause()` it moves exactly as far as the paused runtime
/// is advanced — which is what makes timer tests deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_anchor: DateTime<Utc>,
    mono_anchor: TokioInstant,
}

impl TokioClock {
    /// Anchors at the current wall-clock time.
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchors at `wall`, as if the wall clock read `wall` right now.
    pub fn anchored_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall_anchor: wall,
            mono_anchor: TokioInstant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TokioInstant::now().saturating_duration_since(self.mono_anchor);
        self.wall_anchor + TimeDelta::from_std(elapsed).unwrap_or_else(|_| TimeDelta::zero())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
