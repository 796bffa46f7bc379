use blitz_protocol::ProtocolError;

use crate::Operation;

/// Errors that can occur while talking to the quiz backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (connect refused, DNS,
    /// timeout, connection reset).
    #[cfg(feature = "http")]
    #[error("{0} request failed: {1}")]
    Request(Operation, #[source] reqwest::Error),

    /// The HTTP client could not be constructed (TLS backend setup).
    #[cfg(feature = "http")]
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    #[error("{operation} rejected with status {status}")]
    Status { operation: Operation, status: u16 },

    /// The body could not be encoded, decoded, or failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The backend is not reachable for a reason other than HTTP
    /// (used by in-process and test backends).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
