//! Codec trait and implementations for serializing/deserializing bodies.
//!
//! The backend client doesn't care HOW bodies are serialized — it just
//! needs something that implements [`Codec`]. The quiz backend speaks
//! JSON today, so [`JsonCodec`] is the only implementation, but the HTTP
//! client is generic over the codec so tests and alternative backends
//! can swap it out.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the backend
/// client, which is shared with spawned request tasks.
pub trait Codec: Send + Sync + 'static {
    /// The `Content-Type` value for bodies produced by this codec.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use blitz_protocol::{AnswerRequest, Codec, JsonCodec, SessionId};
///
/// let codec = JsonCodec;
///
/// let request = AnswerRequest {
///     session_id: SessionId::from("s-1"),
///     question_index: 0,
///     selected_index: 2,
/// };
///
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: AnswerRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{LeaderboardResponse, StartSessionResponse};

    #[test]
    fn test_json_codec_content_type() {
        assert_eq!(JsonCodec.content_type(), "application/json");
    }

    #[test]
    fn test_json_codec_decodes_start_response() {
        let body = br#"{
            "session_id": "abc",
            "ends_at": "2030-01-01T00:05:00Z",
            "questions": [{"index": 0, "prompt": "Q?", "options": ["a", "b"]}]
        }"#;
        let resp: StartSessionResponse = JsonCodec.decode(body).unwrap();
        assert_eq!(resp.session_id.as_str(), "abc");
        assert_eq!(resp.questions.len(), 1);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<LeaderboardResponse, _> =
            JsonCodec.decode(b"<html>502</html>");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
