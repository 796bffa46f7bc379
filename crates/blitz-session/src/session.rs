//! Session data: the state of one timed round.
//!
//! A [`Session`] is created when the backend accepts a start request and
//! discarded on return to the intro. Its fields are read-only to the
//! outside world; only [`SessionMachine`](crate::SessionMachine) writes
//! them.

use std::collections::HashSet;

use blitz_protocol::{AnswerResponse, Question, SessionId};
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// AnsweredSet
// ---------------------------------------------------------------------------

/// Tracks which questions have been scored, and which are waiting on the
/// backend.
///
/// ```text
///   (none) ──reserve──→ in flight ──mark_answered──→ answered
///                          │
///                          └──release──→ (none)   (request failed)
/// ```
///
/// An index is only marked answered after its scoring response has been
/// applied, so a failed request leaves it open for a retry. While a
/// request is in flight the index is reserved, so a second click can't
/// double-score. Once answered, an index stays answered for the life of
/// the session.
#[derive(Debug, Clone, Default)]
pub struct AnsweredSet {
    answered: HashSet<u32>,
    in_flight: HashSet<u32>,
}

impl AnsweredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `index` has been scored.
    pub fn is_answered(&self, index: u32) -> bool {
        self.answered.contains(&index)
    }

    /// Whether a submission for `index` is waiting on the backend.
    pub fn is_in_flight(&self, index: u32) -> bool {
        self.in_flight.contains(&index)
    }

    /// Claim `index` for a submission. Returns `false` if it is already
    /// answered or in flight.
    pub(crate) fn reserve(&mut self, index: u32) -> bool {
        if self.is_answered(index) {
            return false;
        }
        self.in_flight.insert(index)
    }

    /// Give up a claim after a failed submission.
    pub(crate) fn release(&mut self, index: u32) {
        self.in_flight.remove(&index);
    }

    /// Record that `index` has been scored.
    pub(crate) fn mark_answered(&mut self, index: u32) {
        self.in_flight.remove(&index);
        self.answered.insert(index);
    }

    /// Number of scored questions.
    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    /// Number of submissions waiting on the backend.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One quiz round.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    expires_at: DateTime<Utc>,
    started_at: DateTime<Utc>,
    /// Round length used for the reported elapsed time.
    max_duration_secs: u32,
    questions: Vec<Question>,
    score: u32,
    streak: u32,
    answered: AnsweredSet,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        expires_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        max_duration_secs: u32,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id,
            expires_at,
            started_at,
            max_duration_secs,
            questions,
            score: 0,
            streak: 0,
            answered: AnsweredSet::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The server-issued deadline. Never changes during the session.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// When the client received the session.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn max_duration_secs(&self) -> u32 {
        self.max_duration_secs
    }

    /// Questions in the order the backend sent them.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Looks a question up by its stable index (not its position).
    pub fn question(&self, index: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.index == index)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn answered(&self) -> &AnsweredSet {
        &self.answered
    }

    pub(crate) fn answered_mut(&mut self) -> &mut AnsweredSet {
        &mut self.answered
    }

    /// Apply a scoring response verbatim and mark the question answered,
    /// in one step.
    pub(crate) fn apply_answer(&mut self, index: u32, response: AnswerResponse) {
        self.score = response.score;
        self.streak = response.streak;
        self.answered.mark_answered(index);
    }
}
