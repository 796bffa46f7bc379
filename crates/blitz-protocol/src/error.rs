//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in a body's shape, not in the
//! network or the stage machine.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, an
    /// `ends_at` that isn't a timestamp, or a truncated body.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed but violates a protocol rule — e.g. a question
    /// without options, or two questions sharing an index.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
