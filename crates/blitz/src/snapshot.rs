//! What the presentation layer gets to see.

use blitz_leaderboard::RefreshOutcome;
use blitz_protocol::{LeaderboardEntry, Question, SessionId};
use blitz_session::{AnswerRejected, Stage};
use serde::Serialize;

/// A question as shown to the player.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: Question,
    /// Scored; further clicks on it are ignored.
    pub answered: bool,
    /// A submission is waiting on the backend.
    pub in_flight: bool,
}

/// Read-only copy of the client state at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub stage: Stage,
    pub session_id: Option<SessionId>,
    /// Whole seconds until expiry while playing; the value frozen at the
    /// end of the round in results; 0 at the intro.
    pub remaining_secs: u64,
    pub score: u32,
    pub streak: u32,
    pub questions: Vec<QuestionView>,
    /// Top rows of the cached leaderboard.
    pub leaderboard: Vec<LeaderboardEntry>,
    pub start_pending: bool,
    pub submitting: bool,
    /// The name field as typed.
    pub player_name: String,
    /// Elapsed seconds a finalize would report (results only).
    pub reported_duration_secs: Option<u32>,
    /// Why the last session start failed, until the next one succeeds.
    pub last_error: Option<String>,
}

impl Snapshot {
    /// Whether the finalize action is available right now.
    pub fn can_finalize(&self) -> bool {
        self.stage == Stage::Results
            && !self.submitting
            && !self.player_name.trim().is_empty()
    }
}

/// Result of an answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The backend scored it; these are the new totals.
    Scored { score: u32, streak: u32 },
    /// Dropped before any network call.
    Ignored(AnswerRejected),
    /// The request failed; the question can be answered again.
    Failed,
    /// The response belonged to a session that has since been discarded.
    Stale,
}

/// Result of a finalize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Nothing was sent: not in results, already submitting, or the
    /// trimmed name was empty.
    Skipped,
    /// The request resolved and the leaderboard was re-fetched.
    /// `accepted` is `false` when the backend call failed.
    Submitted {
        accepted: bool,
        leaderboard: RefreshOutcome,
    },
}
