//! Error types for the session layer.

use std::fmt;

use blitz_protocol::ProtocolError;

use crate::Stage;

/// Errors from transitions that must succeed or be reported.
///
/// Only session start reports errors; every other guarded operation is a
/// silent no-op when its preconditions fail.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The action isn't allowed in the current stage — e.g. starting a
    /// round while one is already being played.
    #[error("cannot {action} while in {stage}")]
    InvalidTransition { stage: Stage, action: &'static str },

    /// A start request is already waiting on the backend.
    #[error("a session start is already in progress")]
    StartInProgress,

    /// The backend's session body broke a protocol rule.
    #[error("invalid session from backend: {0}")]
    InvalidSession(#[from] ProtocolError),
}

/// Why an answer submission was dropped without a network call.
///
/// These are not errors: the UI may fire clicks at any time and the
/// machine simply ignores the ones that can't count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRejected {
    /// No round is being played.
    NoActiveSession,
    /// The question index isn't part of this session.
    UnknownQuestion,
    /// The selected option doesn't exist on that question.
    InvalidOption,
    /// The question has already been scored.
    AlreadyAnswered,
    /// A submission for this question is still waiting on the backend.
    InFlight,
}

impl fmt::Display for AnswerRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoActiveSession => "no active session",
            Self::UnknownQuestion => "unknown question",
            Self::InvalidOption => "invalid option",
            Self::AlreadyAnswered => "already answered",
            Self::InFlight => "answer already in flight",
        };
        f.write_str(reason)
    }
}
