//! Wire protocol for Arcane Blitz.
//!
//! This crate defines the shapes the quiz client and the quiz backend
//! exchange:
//!
//! - **Types** ([`StartSessionResponse`], [`AnswerRequest`],
//!   [`LeaderboardEntry`], etc.) — request and response bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding,
//!   decoding, or validating a body.
//!
//! # Architecture
//!
//! The protocol layer sits between the backend client (raw HTTP bodies)
//! and the session layer (stage machine). It doesn't know about HTTP or
//! stages — it only knows how to serialize and validate messages.
//!
//! ```text
//! Backend (bytes) → Protocol (typed bodies) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AnswerRequest, AnswerResponse, FinalizeRequest, LeaderboardEntry,
    LeaderboardResponse, Question, SessionId, StartSessionResponse,
    DEFAULT_PLAYER_NAME,
};
