//! The session state machine.
//!
//! [`SessionMachine`] is the single owner of the current stage and
//! session. Every change — starting, scoring, expiring, ending,
//! finalizing, restarting — goes through one of its methods, and each
//! method checks its preconditions first. When they fail the call is a
//! no-op: nothing changes and nothing is sent.
//!
//! Network work is split in two halves. A `begin_*` method validates
//! and returns the request to send; the matching `complete_*` or
//! `fail_*` method applies the outcome once the backend answers. Each
//! outcome carries the [`SessionId`] it was issued under, so a response
//! that arrives after its session was discarded is ignored.
//!
//! ## Lifecycle
//!
//! ```text
//! begin_start ──→ complete_start ──→ begin_answer ──→ complete_answer
//!      │                │                                   │
//!      ▼                ▼                                   ▼
//!  fail_start       [Playing] ──expire / end──→ [Results] ──begin_finalize
//!      │                                            │
//!      ▼                                            ▼
//!   [Intro] ←──────────────restart──────────────────┘
//! ```

use blitz_countdown::remaining_secs;
use blitz_protocol::{
    AnswerRequest, AnswerResponse, FinalizeRequest, SessionId,
    StartSessionResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{AnswerRejected, QuizConfig, Session, SessionError, Stage};

/// Stage plus the data that only exists in that stage. Holding the
/// session inside the variant makes "a session exists iff we're past
/// the intro" impossible to violate.
#[derive(Debug)]
enum Phase {
    Intro {
        start_pending: bool,
    },
    Playing {
        session: Session,
    },
    Results {
        session: Session,
        /// Whole seconds left on the countdown when the round ended.
        remaining_at_end: u64,
        submitting: bool,
    },
}

/// Owns the quiz stage, the current session, and the player-name field.
#[derive(Debug)]
pub struct SessionMachine {
    config: QuizConfig,
    phase: Phase,
    player_name: String,
}

/// Elapsed seconds to report for a round of `max_secs` that ended with
/// `remaining_secs` on the clock, clamped to `0..=max_secs`.
pub fn reported_elapsed_secs(max_secs: u32, remaining_secs: u64) -> u32 {
    let remaining = u32::try_from(remaining_secs).unwrap_or(u32::MAX);
    max_secs.saturating_sub(remaining.min(max_secs))
}

impl SessionMachine {
    /// Creates a machine in [`Stage::Intro`].
    pub fn new(config: QuizConfig) -> Self {
        Self {
            config: config.validated(),
            phase: Phase::Intro {
                start_pending: false,
            },
            player_name: String::new(),
        }
    }

    // -- Queries ----------------------------------------------------------

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// The current stage. Exactly one is active at any time.
    pub fn stage(&self) -> Stage {
        match self.phase {
            Phase::Intro { .. } => Stage::Intro,
            Phase::Playing { .. } => Stage::Playing,
            Phase::Results { .. } => Stage::Results,
        }
    }

    /// The current session, in Playing or Results.
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Intro { .. } => None,
            Phase::Playing { session } | Phase::Results { session, .. } => {
                Some(session)
            }
        }
    }

    fn session_mut(&mut self) -> Option<&mut Session> {
        match &mut self.phase {
            Phase::Intro { .. } => None,
            Phase::Playing { session } | Phase::Results { session, .. } => {
                Some(session)
            }
        }
    }

    /// Whether `id` names the session currently held.
    pub fn is_current(&self, id: &SessionId) -> bool {
        self.session().is_some_and(|s| s.id() == id)
    }

    /// Score of the current session, 0 at the intro.
    pub fn score(&self) -> u32 {
        self.session().map_or(0, Session::score)
    }

    /// Streak of the current session, 0 at the intro.
    pub fn streak(&self) -> u32 {
        self.session().map_or(0, Session::streak)
    }

    /// Whether a start request is waiting on the backend.
    pub fn is_start_pending(&self) -> bool {
        matches!(
            self.phase,
            Phase::Intro {
                start_pending: true
            }
        )
    }

    /// Whether a finalize request is waiting on the backend.
    pub fn is_submitting(&self) -> bool {
        matches!(
            self.phase,
            Phase::Results {
                submitting: true,
                ..
            }
        )
    }

    /// Seconds left on the countdown when the round ended.
    pub fn remaining_at_end(&self) -> Option<u64> {
        match self.phase {
            Phase::Results {
                remaining_at_end, ..
            } => Some(remaining_at_end),
            _ => None,
        }
    }

    /// Elapsed seconds that finalize would report, in Results.
    pub fn reported_duration_secs(&self) -> Option<u32> {
        match &self.phase {
            Phase::Results {
                session,
                remaining_at_end,
                ..
            } => Some(reported_elapsed_secs(
                session.max_duration_secs(),
                *remaining_at_end,
            )),
            _ => None,
        }
    }

    /// The player-name field as typed (untrimmed).
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    // -- Intro → Playing --------------------------------------------------

    /// Claim the start slot before calling the backend.
    ///
    /// # Errors
    /// - [`SessionError::InvalidTransition`] outside the intro
    /// - [`SessionError::StartInProgress`] if a start is already pending
    pub fn begin_start(&mut self) -> Result<(), SessionError> {
        let stage = self.stage();
        match &mut self.phase {
            Phase::Intro { start_pending } => {
                if *start_pending {
                    return Err(SessionError::StartInProgress);
                }
                *start_pending = true;
                debug!("session start requested");
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition {
                stage,
                action: "start a session",
            }),
        }
    }

    /// Enter Playing with the backend's session. Score, streak and the
    /// answered set start empty.
    ///
    /// `now` is when the response arrived; it anchors the derived round
    /// length.
    ///
    /// # Errors
    /// - [`SessionError::InvalidTransition`] if no start is pending
    /// - [`SessionError::InvalidSession`] if the body fails validation;
    ///   the machine stays in the intro and start can be retried
    pub fn complete_start(
        &mut self,
        response: StartSessionResponse,
        now: DateTime<Utc>,
    ) -> Result<&Session, SessionError> {
        if !self.is_start_pending() {
            return Err(SessionError::InvalidTransition {
                stage: self.stage(),
                action: "complete a start",
            });
        }
        if let Err(e) = response.validate() {
            self.fail_start();
            return Err(e.into());
        }

        let max_duration_secs = self.round_length_secs(response.ends_at, now);
        let session = Session::new(
            response.session_id,
            response.ends_at,
            now,
            max_duration_secs,
            response.questions,
        );
        info!(
            session_id = %session.id(),
            ends_at = %session.expires_at(),
            questions = session.questions().len(),
            max_duration_secs,
            "session started"
        );

        self.player_name.clear();
        self.phase = Phase::Playing { session };
        Ok(self.session().expect("just entered Playing"))
    }

    /// Release the start slot after a failed request. Stays in the intro.
    pub fn fail_start(&mut self) {
        if let Phase::Intro { start_pending } = &mut self.phase {
            *start_pending = false;
        }
    }

    fn round_length_secs(&self, ends_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        if !self.config.derive_duration {
            return self.config.max_duration_secs();
        }
        let millis = (ends_at - now).num_milliseconds();
        if millis <= 0 {
            warn!(%ends_at, %now, "session already expired on arrival — using configured round length");
            return self.config.max_duration_secs();
        }
        // Round to the nearest second: transport latency shaves a few
        // milliseconds off a round that is meant to be whole seconds.
        let secs = (millis + 500) / 1000;
        u32::try_from(secs).unwrap_or(u32::MAX).max(1)
    }

    // -- Answers ----------------------------------------------------------

    /// Validate a submission and reserve its question.
    ///
    /// Returns the request to send, or why the submission was dropped.
    /// A rejected submission changes nothing.
    pub fn begin_answer(
        &mut self,
        question_index: u32,
        selected_index: u32,
    ) -> Result<AnswerRequest, AnswerRejected> {
        let Phase::Playing { session } = &mut self.phase else {
            return Err(AnswerRejected::NoActiveSession);
        };
        let question = session
            .question(question_index)
            .ok_or(AnswerRejected::UnknownQuestion)?;
        if !question.has_option(selected_index) {
            return Err(AnswerRejected::InvalidOption);
        }
        if session.answered().is_answered(question_index) {
            return Err(AnswerRejected::AlreadyAnswered);
        }
        if !session.answered_mut().reserve(question_index) {
            return Err(AnswerRejected::InFlight);
        }

        Ok(AnswerRequest {
            session_id: session.id().clone(),
            question_index,
            selected_index,
        })
    }

    /// Apply a scoring response.
    ///
    /// Applied while the session it was issued under is still held —
    /// including after the round moved to Results, since the backend has
    /// already counted it. Returns `false` if the response was stale.
    pub fn complete_answer(
        &mut self,
        session_id: &SessionId,
        question_index: u32,
        response: AnswerResponse,
    ) -> bool {
        let Some(session) = self.session_mut().filter(|s| s.id() == session_id)
        else {
            debug!(%session_id, question_index, "ignoring stale answer response");
            return false;
        };
        if session.answered().is_answered(question_index) {
            // Only reachable if the backend answered one request twice.
            warn!(%session_id, question_index, "duplicate scoring response ignored");
            return false;
        }
        session.apply_answer(question_index, response);
        info!(
            %session_id,
            question_index,
            score = response.score,
            streak = response.streak,
            "answer scored"
        );
        true
    }

    /// Release a question after its submission failed, so it can be
    /// answered again.
    pub fn fail_answer(&mut self, session_id: &SessionId, question_index: u32) {
        if let Some(session) = self.session_mut().filter(|s| s.id() == session_id) {
            session.answered_mut().release(question_index);
        }
    }

    // -- Playing → Results ------------------------------------------------

    /// Countdown expiry for `session_id`. Ignored unless that session is
    /// being played. Returns `true` if the machine moved to Results.
    pub fn expire(&mut self, session_id: &SessionId, now: DateTime<Utc>) -> bool {
        let playing_this = matches!(
            &self.phase,
            Phase::Playing { session } if session.id() == session_id
        );
        if !playing_this {
            debug!(%session_id, stage = %self.stage(), "ignoring expiry");
            return false;
        }
        self.finish_round(now, "expired")
    }

    /// The player ended the round early. Ignored outside Playing, so a
    /// second end (or an end racing an expiry) does nothing.
    pub fn end(&mut self, now: DateTime<Utc>) -> bool {
        if !self.stage().is_playing() {
            debug!(stage = %self.stage(), "ignoring end");
            return false;
        }
        self.finish_round(now, "ended")
    }

    fn finish_round(&mut self, now: DateTime<Utc>, how: &'static str) -> bool {
        let phase = std::mem::replace(
            &mut self.phase,
            Phase::Intro {
                start_pending: false,
            },
        );
        let Phase::Playing { session } = phase else {
            self.phase = phase;
            return false;
        };

        let remaining_at_end = remaining_secs(session.expires_at(), now);
        info!(
            session_id = %session.id(),
            how,
            remaining_secs = remaining_at_end,
            score = session.score(),
            streak = session.streak(),
            "round over"
        );
        self.phase = Phase::Results {
            session,
            remaining_at_end,
            submitting: false,
        };
        true
    }

    // -- Results ----------------------------------------------------------

    /// Build the finalize request and mark the results view as
    /// submitting.
    ///
    /// Returns `None` — and changes nothing — outside Results, while a
    /// finalize is already in flight, or when the trimmed player name is
    /// empty. On success the player-name field is cleared, whatever the
    /// backend later says.
    pub fn begin_finalize(&mut self) -> Option<FinalizeRequest> {
        let name = self.player_name.trim().to_string();
        let Phase::Results {
            session,
            remaining_at_end,
            submitting,
        } = &mut self.phase
        else {
            return None;
        };
        if *submitting || name.is_empty() {
            return None;
        }

        *submitting = true;
        let request = FinalizeRequest {
            player_name: name,
            score: session.score(),
            duration_seconds: reported_elapsed_secs(
                session.max_duration_secs(),
                *remaining_at_end,
            ),
            streak: session.streak(),
        };
        self.player_name.clear();
        info!(
            session_id = %session.id(),
            player = %request.player_name,
            score = request.score,
            duration_seconds = request.duration_seconds,
            "finalizing score"
        );
        Some(request)
    }

    /// The finalize request for `session_id` resolved (either way).
    pub fn complete_finalize(&mut self, session_id: &SessionId) {
        if let Phase::Results {
            session,
            submitting,
            ..
        } = &mut self.phase
        {
            if session.id() == session_id {
                *submitting = false;
            }
        }
    }

    // -- Results → Intro --------------------------------------------------

    /// Discard the session and return to the intro. Does not start a new
    /// session. Ignored outside Results.
    pub fn restart(&mut self) -> bool {
        let Phase::Results { session, .. } = &self.phase else {
            debug!(stage = %self.stage(), "ignoring restart");
            return false;
        };
        info!(session_id = %session.id(), "session discarded");
        self.phase = Phase::Intro {
            start_pending: false,
        };
        self.player_name.clear();
        true
    }
}
