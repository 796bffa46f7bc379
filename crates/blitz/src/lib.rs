//! # Arcane Blitz
//!
//! Client for timed quiz rounds: start a session, answer questions
//! against a server-issued deadline, submit the score, and show the
//! leaderboard.
//!
//! The client runs as a single Tokio task that owns all state. You talk
//! to it through a [`QuizHandle`]; every method is a message to that
//! task, so handles can be cloned freely across tasks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blitz::prelude::*;
//!
//! # async fn run() -> Result<(), BlitzError> {
//! let quiz = QuizHandle::builder()
//!     .build(HttpBackend::new(HttpBackendConfig::default())?);
//!
//! quiz.start().await?;
//! let snapshot = quiz.snapshot().await?;
//! println!("{} questions, {}s left", snapshot.questions.len(), snapshot.remaining_secs);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Layer | Crate |
//! |---|---|
//! | wire types | `blitz-protocol` |
//! | remote calls | `blitz-backend` |
//! | deadline polling | `blitz-countdown` |
//! | stage machine | `blitz-session` |
//! | ranked list | `blitz-leaderboard` |

mod actor;
mod client;
mod error;
mod snapshot;

pub use client::{DEFAULT_CHANNEL_SIZE, QuizClientBuilder, QuizHandle};
pub use error::BlitzError;
pub use snapshot::{AnswerOutcome, FinalizeOutcome, QuestionView, Snapshot};

pub use blitz_backend as backend;
pub use blitz_countdown as countdown;
pub use blitz_leaderboard as leaderboard;
pub use blitz_protocol as protocol;
pub use blitz_session as session;

/// Everything needed to build and drive a client.
pub mod prelude {
    #[cfg(feature = "http")]
    pub use blitz_backend::{HttpBackend, HttpBackendConfig};
    pub use blitz_backend::{Backend, BackendError};
    pub use blitz_countdown::{Clock, SystemClock, format_mm_ss};
    pub use blitz_leaderboard::RefreshOutcome;
    pub use blitz_protocol::{LeaderboardEntry, Question, SessionId};
    pub use blitz_session::{AnswerRejected, QuizConfig, Stage};

    pub use crate::{
        AnswerOutcome, BlitzError, FinalizeOutcome, QuizClientBuilder,
        QuizHandle, Snapshot,
    };
}
