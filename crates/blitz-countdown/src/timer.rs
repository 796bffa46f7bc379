//! The polling task behind a [`Countdown`].

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::{Clock, Countdown, CountdownConfig};

/// Signal sent by a [`CountdownTimer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent<K> {
    /// The deadline armed under `key` has passed. Sent at most once per
    /// arm.
    Expired { key: K },
}

/// The task currently polling, plus what it was armed for.
struct Armed<K> {
    key: K,
    expires_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

/// Cancellable countdown task, keyed by whatever the caller arms it for
/// (the quiz client uses the session id).
///
/// At most one polling task runs at a time. [`arm`](Self::arm) always
/// cancels the previous task before spawning the new one, and dropping
/// the timer cancels it too, so an expiry can never be sent for a
/// deadline that has been replaced.
///
/// An `Expired` event that was already queued before a cancel can still
/// be received; consumers should compare its key against what they
/// consider current.
pub struct CountdownTimer<K> {
    config: CountdownConfig,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<CountdownEvent<K>>,
    remaining: Arc<watch::Sender<u64>>,
    armed: Option<Armed<K>>,
}

impl<K> CountdownTimer<K>
where
    K: Clone + Display + Send + Sync + 'static,
{
    /// Create an idle timer. Nothing polls until [`arm`](Self::arm).
    pub fn new(
        config: CountdownConfig,
        clock: Arc<dyn Clock>,
        events: mpsc::UnboundedSender<CountdownEvent<K>>,
    ) -> Self {
        let (remaining, _) = watch::channel(0);
        Self {
            config: config.validated(),
            clock,
            events,
            remaining: Arc::new(remaining),
            armed: None,
        }
    }

    /// Start counting down to `expires_at`, replacing any armed deadline.
    ///
    /// The first observation happens immediately, so remaining time is
    /// published (and an already-passed deadline fires) without waiting
    /// a full interval.
    pub fn arm(&mut self, key: K, expires_at: DateTime<Utc>) {
        self.cancel();

        let clock = Arc::clone(&self.clock);
        let remaining = Arc::clone(&self.remaining);
        let events = self.events.clone();
        let poll_interval = self.config.poll_interval;
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let mut countdown = Countdown::new(expires_at);
            let mut interval = time::interval(poll_interval);
            // After a stall, poll once and carry on; remaining time is
            // re-derived anyway, so bursts of catch-up polls add nothing.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let tick = countdown.poll(clock.now());
                remaining.send_replace(tick.remaining_secs);
                trace!(key = %task_key, remaining_secs = tick.remaining_secs, "countdown poll");

                if tick.expired_now {
                    info!(key = %task_key, "countdown expired");
                    let _ = events.send(CountdownEvent::Expired { key: task_key });
                    break;
                }
            }
        });

        debug!(%key, %expires_at, "countdown armed");
        self.armed = Some(Armed {
            key,
            expires_at,
            handle,
        });
    }

    /// Stop polling. Safe to call when idle.
    ///
    /// The last published remaining value is left as-is.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
            debug!(key = %armed.key, "countdown cancelled");
        }
    }

    /// Whether a polling task is armed (it may already have fired).
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// The key the timer is currently armed for.
    pub fn armed_key(&self) -> Option<&K> {
        self.armed.as_ref().map(|a| &a.key)
    }

    /// The deadline the timer is currently armed for.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.armed.as_ref().map(|a| a.expires_at)
    }

    /// Latest published remaining seconds.
    pub fn remaining_secs(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Live view of remaining seconds, updated on every poll.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.subscribe()
    }

    /// Reset the published remaining value to 0 (e.g. back at the intro).
    pub fn clear_remaining(&self) {
        self.remaining.send_replace(0);
    }

    /// The effective (validated) configuration.
    pub fn config(&self) -> CountdownConfig {
        self.config
    }
}

impl<K> Drop for CountdownTimer<K> {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
        }
    }
}
