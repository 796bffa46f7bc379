//! Drift-free countdown against an absolute expiry instant.
//!
//! The backend hands the client an absolute `ends_at` instant. The
//! countdown turns that into a live "seconds remaining" value and
//! signals expiry exactly once.
//!
//! # Drift
//!
//! Remaining time is never decremented. Every poll re-derives it from
//! `expires_at − now`, so a late or skipped poll shows the right value
//! on the next one and error never accumulates.
//!
//! # Layers
//!
//! - [`Countdown`] — pure state: feed it "now", get remaining seconds
//!   and a one-shot expiry flag. No I/O, no Tokio.
//! - [`CountdownTimer`] — owns a Tokio task that polls a [`Countdown`] at
//!   a fixed interval, publishes remaining seconds on a `watch` channel
//!   and sends [`CountdownEvent::Expired`] once. Re-arming cancels the
//!   old task and spawns a new one; it never mutates a running task.
//!
//! # Integration
//!
//! The timer is designed to feed an actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         Some(CountdownEvent::Expired { key }) = timer_rx.recv() => {
//!             machine.expire(&key);
//!         }
//!     }
//! }
//! ```

mod clock;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use timer::{CountdownEvent, CountdownTimer};

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the countdown polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    /// How often remaining time is recomputed. Default: 1 second.
    pub poll_interval: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl CountdownConfig {
    /// Shortest allowed poll interval.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
    /// Longest allowed poll interval.
    pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

    /// Clamp `poll_interval` into
    /// [`MIN_POLL_INTERVAL`](Self::MIN_POLL_INTERVAL)..=[`MAX_POLL_INTERVAL`](Self::MAX_POLL_INTERVAL).
    ///
    /// Called automatically by [`CountdownTimer::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self
            .poll_interval
            .clamp(Self::MIN_POLL_INTERVAL, Self::MAX_POLL_INTERVAL);
        if clamped != self.poll_interval {
            warn!(
                requested_ms = self.poll_interval.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "poll_interval out of range — clamping"
            );
            self.poll_interval = clamped;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Pure countdown
// ---------------------------------------------------------------------------

/// Whole seconds from `now` until `expires_at`, floor-rounded, never
/// negative.
pub fn remaining_secs(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let delta = expires_at - now;
    if delta <= TimeDelta::zero() {
        0
    } else {
        // num_seconds truncates toward zero, which is floor for positives.
        delta.num_seconds() as u64
    }
}

/// Renders seconds as `MM:SS`. Minutes are not capped at 59.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Result of one [`Countdown::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Floor-rounded seconds left, clamped to 0.
    pub remaining_secs: u64,
    /// `true` only on the first poll that observes `now >= expires_at`.
    pub expired_now: bool,
}

/// Countdown state for one armed expiry instant.
///
/// ```text
///   armed ──(poll, now < T)──→ armed
///     │
///     └──(poll, now ≥ T)──→ fired ──(poll)──→ fired (remaining 0, no event)
/// ```
#[derive(Debug, Clone)]
pub struct Countdown {
    expires_at: DateTime<Utc>,
    fired: bool,
}

impl Countdown {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            fired: false,
        }
    }

    /// The instant this countdown runs to.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether expiry has already been reported.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Observe the countdown at `now`.
    ///
    /// Expiry is reported once per armed period, even if later polls
    /// also land at or past the deadline, or the clock steps backwards.
    pub fn poll(&mut self, now: DateTime<Utc>) -> CountdownTick {
        let remaining_secs = if self.fired {
            0
        } else {
            remaining_secs(self.expires_at, now)
        };
        let expired_now = !self.fired && now >= self.expires_at;
        if expired_now {
            self.fired = true;
        }
        CountdownTick {
            remaining_secs,
            expired_now,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_remaining_is_floor_rounded() {
        let end = t0() + TimeDelta::milliseconds(4_900);
        assert_eq!(remaining_secs(end, t0()), 4);
        assert_eq!(remaining_secs(end, t0() + TimeDelta::milliseconds(4_000)), 0);
    }

    #[test]
    fn test_remaining_clamps_to_zero_after_deadline() {
        assert_eq!(remaining_secs(t0(), t0() + TimeDelta::seconds(30)), 0);
        assert_eq!(remaining_secs(t0(), t0()), 0);
    }

    #[test]
    fn test_format_mm_ss() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(300), "05:00");
        assert_eq!(format_mm_ss(6_000), "100:00");
    }

    #[test]
    fn test_poll_before_deadline_does_not_fire() {
        let mut c = Countdown::new(t0() + TimeDelta::seconds(5));
        let tick = c.poll(t0());
        assert_eq!(tick.remaining_secs, 5);
        assert!(!tick.expired_now);
        assert!(!c.has_fired());
    }

    #[test]
    fn test_fires_at_first_poll_at_or_after_deadline() {
        let end = t0() + TimeDelta::seconds(5);
        let mut c = Countdown::new(end);

        // Less than a second left: display shows 0 but the deadline
        // hasn't passed yet.
        let tick = c.poll(end - TimeDelta::milliseconds(500));
        assert_eq!(tick.remaining_secs, 0);
        assert!(!tick.expired_now);

        let tick = c.poll(end);
        assert_eq!(tick.remaining_secs, 0);
        assert!(tick.expired_now);
    }

    #[test]
    fn test_repolling_after_expiry_never_refires() {
        let end = t0();
        let mut c = Countdown::new(end);
        assert!(c.poll(end).expired_now);
        for secs in [0, 1, 10, 3_600] {
            let tick = c.poll(end + TimeDelta::seconds(secs));
            assert_eq!(tick.remaining_secs, 0);
            assert!(!tick.expired_now);
        }
    }

    #[test]
    fn test_clock_stepping_back_after_expiry_stays_at_zero() {
        let end = t0();
        let mut c = Countdown::new(end);
        assert!(c.poll(end + TimeDelta::seconds(1)).expired_now);
        let tick = c.poll(end - TimeDelta::seconds(30));
        assert_eq!(tick.remaining_secs, 0);
        assert!(!tick.expired_now);
    }

    #[test]
    fn test_skipped_polls_do_not_accumulate_error() {
        let end = t0() + TimeDelta::seconds(300);
        let mut c = Countdown::new(end);
        assert_eq!(c.poll(t0()).remaining_secs, 300);
        // A long stall: the next poll lands 2 minutes later.
        assert_eq!(c.poll(t0() + TimeDelta::seconds(120)).remaining_secs, 180);
    }

    #[test]
    fn test_config_default_is_one_second() {
        assert_eq!(CountdownConfig::default().poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_validated_clamps() {
        let low = CountdownConfig {
            poll_interval: Duration::ZERO,
        }
        .validated();
        assert_eq!(low.poll_interval, CountdownConfig::MIN_POLL_INTERVAL);

        let high = CountdownConfig {
            poll_interval: Duration::from_secs(3_600),
        }
        .validated();
        assert_eq!(high.poll_interval, CountdownConfig::MAX_POLL_INTERVAL);
    }
}
