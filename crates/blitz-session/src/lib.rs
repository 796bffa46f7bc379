//! Quiz session lifecycle for Arcane Blitz.
//!
//! This crate owns everything about one timed round that isn't I/O:
//!
//! 1. **Stages** — `Intro → Playing → Results → Intro` ([`Stage`])
//! 2. **Session state** — id, deadline, questions, score, streak
//!    ([`Session`])
//! 3. **Answer tracking** — at most one scored answer per question
//!    ([`AnsweredSet`])
//! 4. **The machine** — the only thing allowed to move between stages
//!    or write session fields ([`SessionMachine`])
//!
//! Nothing here touches the network or spawns tasks. Time comes in as a
//! `now` argument, so every transition is deterministic and testable.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client actor (above)  ← performs I/O, feeds results into the machine
//!     ↕
//! Session layer (this crate)  ← stage machine, score/streak, answered set
//!     ↕
//! Protocol layer (below)  ← SessionId, Question, request/response bodies
//! ```

mod config;
mod error;
mod machine;
mod session;

pub use config::{QuizConfig, Stage};
pub use error::{AnswerRejected, SessionError};
pub use machine::{SessionMachine, reported_elapsed_secs};
pub use session::{AnsweredSet, Session};
