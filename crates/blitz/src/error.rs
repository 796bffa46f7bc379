//! Unified error type for the quiz client.

use blitz_backend::BackendError;
use blitz_protocol::ProtocolError;
use blitz_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of [`QuizHandle`](crate::QuizHandle) deal with this single
/// type; `#[from]` lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BlitzError {
    /// A body could not be encoded, decoded, or failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The session machine refused the transition.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The client task has stopped; no further commands are accepted.
    #[error("quiz client has shut down")]
    ClientClosed,
}
