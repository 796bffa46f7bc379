//! Backend abstraction layer for Arcane Blitz.
//!
//! Provides the [`Backend`] trait — the four remote operations the quiz
//! client depends on — and an HTTP implementation.
//!
//! # Feature Flags
//!
//! - `http` (default) — [`HttpBackend`] via `reqwest`
//!
//! # Operation classes
//!
//! Not every remote call matters equally. Starting a session MUST
//! succeed before the round can begin, so its failure is reported to
//! the operator. Everything else is best-effort: a failed answer,
//! finalize, or leaderboard fetch is logged and dropped, leaving prior
//! state untouched. [`Operation::class`] makes that split explicit so
//! callers don't have to remember it.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::BackendError;
#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpBackendConfig, BACKEND_URL_ENV};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use blitz_protocol::{
    AnswerRequest, AnswerResponse, FinalizeRequest, LeaderboardResponse,
    StartSessionResponse,
};

/// The remote operations the quiz client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartSession,
    SubmitAnswer,
    Finalize,
    FetchLeaderboard,
}

/// How a failure of an [`Operation`] must be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// Failure blocks the transition and is surfaced to the caller.
    MustSucceed,
    /// Failure is logged and swallowed; prior state stays intact.
    BestEffort,
}

impl Operation {
    /// The failure class for this operation.
    pub fn class(self) -> OperationClass {
        match self {
            Self::StartSession => OperationClass::MustSucceed,
            Self::SubmitAnswer | Self::Finalize | Self::FetchLeaderboard => {
                OperationClass::BestEffort
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartSession => write!(f, "start-session"),
            Self::SubmitAnswer => write!(f, "submit-answer"),
            Self::Finalize => write!(f, "finalize"),
            Self::FetchLeaderboard => write!(f, "fetch-leaderboard"),
        }
    }
}

/// The quiz backend as seen by the client.
///
/// Each method is one network round trip. Requests are taken by value
/// so the returned future owns everything it needs and can be moved
/// into a spawned task.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the backend is shared (behind an `Arc`)
///   with the request tasks the client spawns.
/// - Every future is `Send` for the same reason.
///
/// # Example
///
/// ```rust
/// use blitz_backend::{Backend, BackendError};
/// use blitz_protocol::*;
///
/// /// A backend that is always down.
/// struct Offline;
///
/// impl Backend for Offline {
///     async fn start_session(&self) -> Result<StartSessionResponse, BackendError> {
///         Err(BackendError::Unavailable("offline".into()))
///     }
///     async fn submit_answer(&self, _: AnswerRequest) -> Result<AnswerResponse, BackendError> {
///         Err(BackendError::Unavailable("offline".into()))
///     }
///     async fn finalize(&self, _: FinalizeRequest) -> Result<(), BackendError> {
///         Err(BackendError::Unavailable("offline".into()))
///     }
///     async fn fetch_leaderboard(&self) -> Result<LeaderboardResponse, BackendError> {
///         Err(BackendError::Unavailable("offline".into()))
///     }
/// }
/// ```
pub trait Backend: Send + Sync + 'static {
    /// Creates a new session: id, expiry instant, and question set.
    fn start_session(
        &self,
    ) -> impl Future<Output = Result<StartSessionResponse, BackendError>> + Send;

    /// Scores one answer and returns the authoritative score and streak.
    fn submit_answer(
        &self,
        request: AnswerRequest,
    ) -> impl Future<Output = Result<AnswerResponse, BackendError>> + Send;

    /// Persists a finished round. The acknowledgement carries no data.
    fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Fetches the ranked leaderboard.
    fn fetch_leaderboard(
        &self,
    ) -> impl Future<Output = Result<LeaderboardResponse, BackendError>> + Send;
}

impl<B: Backend> Backend for Arc<B> {
    fn start_session(
        &self,
    ) -> impl Future<Output = Result<StartSessionResponse, BackendError>> + Send
    {
        (**self).start_session()
    }

    fn submit_answer(
        &self,
        request: AnswerRequest,
    ) -> impl Future<Output = Result<AnswerResponse, BackendError>> + Send {
        (**self).submit_answer(request)
    }

    fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).finalize(request)
    }

    fn fetch_leaderboard(
        &self,
    ) -> impl Future<Output = Result<LeaderboardResponse, BackendError>> + Send
    {
        (**self).fetch_leaderboard()
    }
}
