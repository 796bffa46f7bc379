//! `QuizClientBuilder` and the handle used to drive a running client.

use std::sync::Arc;

use blitz_backend::Backend;
use blitz_countdown::{Clock, SystemClock};
use blitz_leaderboard::RefreshOutcome;
use blitz_protocol::SessionId;
use blitz_session::QuizConfig;
use tokio::sync::{mpsc, oneshot, watch};

use crate::actor::{Command, spawn_client};
use crate::{AnswerOutcome, BlitzError, FinalizeOutcome, Snapshot};

/// Default capacity of the command channel.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Builder for configuring and starting a quiz client.
///
/// # Example
///
/// ```rust,no_run
/// use blitz::prelude::*;
///
/// # async fn run() -> Result<(), BlitzError> {
/// let backend = HttpBackend::new(HttpBackendConfig::from_env())?;
/// let quiz = QuizHandle::builder()
///     .config(QuizConfig::default())
///     .build(backend);
///
/// quiz.start().await?;
/// quiz.answer(0, 2).await?;
/// # Ok(())
/// # }
/// ```
pub struct QuizClientBuilder {
    config: QuizConfig,
    clock: Arc<dyn Clock>,
    channel_size: usize,
}

impl QuizClientBuilder {
    /// Creates a builder with default settings and the system clock.
    pub fn new() -> Self {
        Self {
            config: QuizConfig::default(),
            clock: Arc::new(SystemClock),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the quiz configuration. It is validated on build.
    pub fn config(mut self, config: QuizConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock that countdowns and round lengths are measured
    /// against.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the command channel capacity (minimum 1).
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Spawns the client task against `backend` and returns a handle.
    ///
    /// Must be called from within a Tokio runtime. The leaderboard is
    /// fetched once immediately.
    pub fn build<B: Backend>(self, backend: B) -> QuizHandle {
        spawn_client(
            self.config.validated(),
            self.clock,
            Arc::new(backend),
            self.channel_size,
        )
    }
}

impl Default for QuizClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running quiz client.
///
/// Cheap to clone: an `mpsc::Sender` plus a `watch::Receiver`. The
/// client task stops when [`shutdown`](Self::shutdown) is called or the
/// last handle is dropped.
#[derive(Clone)]
pub struct QuizHandle {
    sender: mpsc::Sender<Command>,
    remaining: watch::Receiver<u64>,
}

impl QuizHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<Command>,
        remaining: watch::Receiver<u64>,
    ) -> Self {
        Self { sender, remaining }
    }

    /// Creates a new builder.
    pub fn builder() -> QuizClientBuilder {
        QuizClientBuilder::new()
    }

    /// Send a command and wait for its reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, BlitzError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| BlitzError::ClientClosed)?;
        reply_rx.await.map_err(|_| BlitzError::ClientClosed)
    }

    /// Starts a round and waits for the backend's session.
    ///
    /// # Errors
    /// - [`BlitzError::Backend`] if the start request failed; still at
    ///   the intro, so it can be retried
    /// - [`BlitzError::Session`] outside the intro, while another start
    ///   is pending, or when the session body is invalid
    pub async fn start(&self) -> Result<SessionId, BlitzError> {
        self.request(|reply| Command::Start { reply }).await?
    }

    /// Submits an answer and waits for it to be scored.
    pub async fn answer(
        &self,
        question_index: u32,
        selected_index: u32,
    ) -> Result<AnswerOutcome, BlitzError> {
        self.request(|reply| Command::Answer {
            question_index,
            selected_index,
            reply,
        })
        .await
    }

    /// Ends the round early. Returns `false` if no round was being
    /// played.
    pub async fn end(&self) -> Result<bool, BlitzError> {
        self.request(|reply| Command::End { reply }).await
    }

    /// Discards the finished round and returns to the intro. Returns
    /// `false` outside results.
    pub async fn restart(&self) -> Result<bool, BlitzError> {
        self.request(|reply| Command::Restart { reply }).await
    }

    /// Replaces the player-name field.
    pub async fn set_player_name(
        &self,
        name: impl Into<String>,
    ) -> Result<(), BlitzError> {
        self.sender
            .send(Command::SetPlayerName { name: name.into() })
            .await
            .map_err(|_| BlitzError::ClientClosed)
    }

    /// Submits the finished round under the current player name, then
    /// re-fetches the leaderboard.
    pub async fn finalize(&self) -> Result<FinalizeOutcome, BlitzError> {
        self.request(|reply| Command::Finalize { reply }).await
    }

    /// Re-fetches the leaderboard now.
    pub async fn refresh_leaderboard(&self) -> Result<RefreshOutcome, BlitzError> {
        self.request(|reply| Command::RefreshLeaderboard { reply })
            .await
    }

    /// Requests a copy of the current state.
    pub async fn snapshot(&self) -> Result<Snapshot, BlitzError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Live remaining seconds, updated on every countdown poll.
    pub fn watch_remaining(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    /// Tells the client task to stop. In-flight requests are abandoned.
    pub async fn shutdown(&self) -> Result<(), BlitzError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| BlitzError::ClientClosed)
    }
}
