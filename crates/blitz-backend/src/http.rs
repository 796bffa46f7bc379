//! HTTP backend implementation using `reqwest`.

use std::time::Duration;

use blitz_protocol::{
    AnswerRequest, AnswerResponse, Codec, FinalizeRequest, JsonCodec,
    LeaderboardResponse, StartSessionResponse,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};

use crate::{Backend, BackendError, Operation};

/// Environment variable that overrides the backend base URL.
pub const BACKEND_URL_ENV: &str = "BLITZ_BACKEND_URL";

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Scheme, host and optional path prefix, e.g. `http://localhost:8000`.
    /// A trailing slash is ignored.
    pub base_url: String,
    /// Per-request timeout, covering connect through body read.
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpBackendConfig {
    /// Defaults, with `base_url` taken from [`BACKEND_URL_ENV`] when set
    /// and non-blank.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config
    }
}

/// A [`Backend`] that talks to the quiz service over HTTP.
///
/// | Operation | Request |
/// |---|---|
/// | start session | `POST /api/start` |
/// | submit answer | `POST /api/answer` |
/// | finalize | `POST /api/submit` |
/// | leaderboard | `GET /api/leaderboard` |
///
/// Bodies are encoded with the codec `C` (JSON by default).
pub struct HttpBackend<C: Codec = JsonCodec> {
    client: Client,
    base_url: String,
    codec: C,
}

impl HttpBackend<JsonCodec> {
    /// Creates a JSON backend client.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> HttpBackend<C> {
    /// Creates a backend client that encodes bodies with `codec`.
    pub fn with_codec(
        config: HttpBackendConfig,
        codec: C,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BackendError::Client)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!(%base_url, "HTTP backend configured");
        Ok(Self {
            client,
            base_url,
            codec,
        })
    }

    /// The base URL every endpoint is joined onto.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<RequestBuilder, BackendError> {
        let bytes = self.codec.encode(body)?;
        Ok(self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, self.codec.content_type())
            .body(bytes))
    }

    /// Sends the request and returns the raw body of a 2xx response.
    async fn execute(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%operation, status = status.as_u16(), "backend rejected request");
            return Err(BackendError::Status {
                operation,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Request(operation, e))?;
        tracing::trace!(%operation, bytes = body.len(), "backend responded");
        Ok(body.to_vec())
    }

    async fn execute_decode<R: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<R, BackendError> {
        let body = self.execute(operation, request).await?;
        Ok(self.codec.decode(&body)?)
    }
}

impl<C: Codec> Backend for HttpBackend<C> {
    async fn start_session(
        &self,
    ) -> Result<StartSessionResponse, BackendError> {
        let request = self.client.post(self.url("/api/start"));
        let response: StartSessionResponse = self
            .execute_decode(Operation::StartSession, request)
            .await?;
        response.validate()?;
        Ok(response)
    }

    async fn submit_answer(
        &self,
        request: AnswerRequest,
    ) -> Result<AnswerResponse, BackendError> {
        let http = self.post("/api/answer", &request)?;
        self.execute_decode(Operation::SubmitAnswer, http).await
    }

    async fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> Result<(), BackendError> {
        let http = self.post("/api/submit", &request)?;
        self.execute(Operation::Finalize, http).await?;
        Ok(())
    }

    async fn fetch_leaderboard(
        &self,
    ) -> Result<LeaderboardResponse, BackendError> {
        let request = self.client.get(self.url("/api/leaderboard"));
        self.execute_decode(Operation::FetchLeaderboard, request).await
    }
}
