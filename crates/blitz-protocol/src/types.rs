//! Request and response bodies exchanged with the quiz backend.
//!
//! Every type here travels "on the wire": the client serializes requests,
//! the backend answers with the response types. Field names are
//! `snake_case` on the wire, matching the backend's JSON.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Name shown for leaderboard entries whose player name is missing.
pub const DEFAULT_PLAYER_NAME: &str = "Mage";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque, server-issued identifier for one quiz session.
///
/// The client never inspects it; it only echoes it back on answer
/// submissions and uses it to tell responses for the current session
/// apart from responses for a session that has already been discarded.
///
/// `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// One quiz question. Immutable once received.
///
/// `index` is the stable key used when answering. It is NOT the
/// question's position in the list — the backend may send questions in
/// any order, and the client must echo back exactly this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub index: u32,
    pub prompt: String,
    /// Answer options, in display order. Never empty in a valid body.
    pub options: Vec<String>,
}

impl Question {
    /// Returns `true` if `selected` names one of this question's options.
    pub fn has_option(&self, selected: u32) -> bool {
        (selected as usize) < self.options.len()
    }

    /// Display label for the option at `position` (`A`, `B`, ...).
    pub fn option_label(position: usize) -> char {
        // Past 'Z' the labels stop being letters; more than 26 options is
        // not something the backend sends.
        char::from_u32('A' as u32 + position as u32).unwrap_or('?')
    }
}

// ---------------------------------------------------------------------------
// Start session
// ---------------------------------------------------------------------------

/// Response to "start session": identity, deadline, and question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,

    /// Absolute instant at which the round ends.
    ///
    /// Accepts RFC 3339 (`2030-01-01T00:05:00Z`) and, because some
    /// backends emit naive ISO timestamps, an offset-less
    /// `2030-01-01T00:05:00.123` which is read as UTC.
    #[serde(with = "ends_at_format")]
    pub ends_at: DateTime<Utc>,

    pub questions: Vec<Question>,
}

impl StartSessionResponse {
    /// Checks the rules serde can't express.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the session id is empty, a
    /// question has no options, or two questions share an index.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.session_id.as_str().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "session_id must not be empty".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for q in &self.questions {
            if q.options.is_empty() {
                return Err(ProtocolError::InvalidMessage(format!(
                    "question {} has no options",
                    q.index
                )));
            }
            if !seen.insert(q.index) {
                return Err(ProtocolError::InvalidMessage(format!(
                    "duplicate question index {}",
                    q.index
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// Request body for "submit answer".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub session_id: SessionId,
    pub question_index: u32,
    pub selected_index: u32,
}

/// The backend's authoritative score and streak after an answer.
///
/// These are applied verbatim; the client never computes either value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub score: u32,
    pub streak: u32,
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

/// Request body for "finalize score". The backend's reply is an opaque
/// acknowledgement and is never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub player_name: String,
    pub score: u32,
    pub duration_seconds: u32,
    pub streak: u32,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// One ranked leaderboard row. Read-only.
///
/// Only `score` is required. Backends attach extra fields (database ids,
/// timestamps); those are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub player_name: String,
    pub score: u32,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub streak: u32,
}

impl LeaderboardEntry {
    /// The name to show for this row, falling back to
    /// [`DEFAULT_PLAYER_NAME`] when the backend stored none.
    pub fn display_name(&self) -> &str {
        if self.player_name.trim().is_empty() {
            DEFAULT_PLAYER_NAME
        } else {
            &self.player_name
        }
    }
}

/// Response to "fetch leaderboard". Ordered by score descending; the
/// order belongs to the backend and is kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub items: Vec<LeaderboardEntry>,
}

// ---------------------------------------------------------------------------
// ends_at (de)serialization
// ---------------------------------------------------------------------------

mod ends_at_format {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer
            .serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, NAIVE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| {
                serde::de::Error::custom(format!(
                    "invalid ends_at {raw:?}: {e}"
                ))
            })
    }
}

// =========================================================================
// Tests
// =========================================================================
