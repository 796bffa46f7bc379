//! Quiz configuration and the stage machine's states.

use std::time::Duration;

use blitz_countdown::CountdownConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// QuizConfig
// ---------------------------------------------------------------------------

/// Settings for a quiz client.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Round length used for the reported elapsed time when it can't be
    /// derived from the session. Default: 300 seconds.
    pub max_duration: Duration,

    /// Derive each round's length from `ends_at − start time` instead
    /// of using `max_duration`. Default: `true`.
    pub derive_duration: bool,

    /// How many leaderboard rows are shown. The cache may hold more.
    pub leaderboard_top_n: usize,

    /// Countdown polling settings.
    pub countdown: CountdownConfig,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(300),
            derive_duration: true,
            leaderboard_top_n: 10,
            countdown: CountdownConfig::default(),
        }
    }
}

impl QuizConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `max_duration` at least 1 second.
    /// - `leaderboard_top_n` at least 1.
    /// - `countdown` validated by [`CountdownConfig::validated`].
    pub fn validated(mut self) -> Self {
        if self.max_duration < Duration::from_secs(1) {
            warn!(
                max_duration_ms = self.max_duration.as_millis() as u64,
                "max_duration below 1s — clamping"
            );
            self.max_duration = Duration::from_secs(1);
        }
        if self.leaderboard_top_n == 0 {
            warn!("leaderboard_top_n is 0 — showing 1 row");
            self.leaderboard_top_n = 1;
        }
        self.countdown = self.countdown.validated();
        self
    }

    /// `max_duration` in whole seconds.
    pub fn max_duration_secs(&self) -> u32 {
        u32::try_from(self.max_duration.as_secs()).unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The coarse state of the quiz.
///
/// ```text
/// Intro ──(start)──→ Playing ──(expire | end)──→ Results
///   ↑                                               │
///   └───────────────────(restart)───────────────────┘
/// ```
///
/// - **Intro**: no session. The leaderboard is shown; a round can start.
/// - **Playing**: a session is live and the countdown is running.
/// - **Results**: the round is over. Score can be finalized once;
///   `restart` goes back to Intro.
///
/// It's a cycle, not a pipeline: Results is left only by `restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intro,
    Playing,
    Results,
}

impl Stage {
    /// The only stage reachable from this one.
    pub fn next(self) -> Self {
        match self {
            Self::Intro => Self::Playing,
            Self::Playing => Self::Results,
            Self::Results => Self::Intro,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }

    /// Returns `true` while a round is being played.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intro => write!(f, "intro"),
            Self::Playing => write!(f, "playing"),
            Self::Results => write!(f, "results"),
        }
    }
}
