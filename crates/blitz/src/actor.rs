//! Quiz client actor: one Tokio task that owns the session machine, the
//! countdown, and the leaderboard cache.
//!
//! Nothing is shared. The task reacts to three inputs, one message at a
//! time:
//!
//! - **commands** from [`QuizHandle`]s
//! - **countdown events** from the [`CountdownTimer`]
//! - **completions** from the request tasks it spawned
//!
//! Backend calls never run on the actor itself. Each one is spawned as
//! its own task that posts its result back as a [`Completion`], so a
//! slow backend can't stall the countdown or the UI.

use std::sync::Arc;

use blitz_backend::{Backend, BackendError, Operation};
use blitz_countdown::{Clock, CountdownEvent, CountdownTimer, remaining_secs};
use blitz_leaderboard::{LeaderboardCache, RefreshOutcome};
use blitz_protocol::{
    AnswerResponse, LeaderboardResponse, SessionId, StartSessionResponse,
};
use blitz_session::{QuizConfig, SessionMachine, Stage};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::QuizHandle;
use crate::{
    AnswerOutcome, BlitzError, FinalizeOutcome, QuestionView, Snapshot,
};

/// Commands sent to the actor through its channel.
///
/// The `oneshot::Sender` in most variants is a reply channel: the
/// handle sends a command and waits for the answer on it.
pub(crate) enum Command {
    Start {
        reply: oneshot::Sender<Result<SessionId, BlitzError>>,
    },
    Answer {
        question_index: u32,
        selected_index: u32,
        reply: oneshot::Sender<AnswerOutcome>,
    },
    End {
        reply: oneshot::Sender<bool>,
    },
    Restart {
        reply: oneshot::Sender<bool>,
    },
    SetPlayerName {
        name: String,
    },
    Finalize {
        reply: oneshot::Sender<FinalizeOutcome>,
    },
    RefreshLeaderboard {
        reply: oneshot::Sender<RefreshOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown,
}

/// Who is waiting for a leaderboard fetch to land.
enum LeaderboardWaiter {
    /// The startup load; nobody.
    Nobody,
    Refresh(oneshot::Sender<RefreshOutcome>),
    /// A finalize that resolves once the board has been re-fetched.
    Finalize {
        session_id: SessionId,
        accepted: bool,
        reply: oneshot::Sender<FinalizeOutcome>,
    },
}

/// A finished backend call, posted back by its request task.
enum Completion {
    Started {
        result: Result<StartSessionResponse, BackendError>,
        reply: oneshot::Sender<Result<SessionId, BlitzError>>,
    },
    Answered {
        session_id: SessionId,
        question_index: u32,
        result: Result<AnswerResponse, BackendError>,
        reply: oneshot::Sender<AnswerOutcome>,
    },
    Finalized {
        session_id: SessionId,
        result: Result<(), BackendError>,
        reply: oneshot::Sender<FinalizeOutcome>,
    },
    Leaderboard {
        result: Result<LeaderboardResponse, BackendError>,
        waiter: LeaderboardWaiter,
    },
}

/// The internal client state. Runs inside a Tokio task.
struct QuizClient<B: Backend> {
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    machine: SessionMachine,
    leaderboard: LeaderboardCache,
    timer: CountdownTimer<SessionId>,
    last_error: Option<String>,
    commands: mpsc::Receiver<Command>,
    countdown_events: mpsc::UnboundedReceiver<CountdownEvent<SessionId>>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
}

impl<B: Backend> QuizClient<B> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        info!("quiz client started");
        self.fetch_leaderboard(LeaderboardWaiter::Nobody);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(event) = self.countdown_events.recv() => {
                    self.handle_countdown(event);
                }
                Some(done) = self.completions.recv() => {
                    self.handle_completion(done);
                }
            }
        }

        self.timer.cancel();
        info!("quiz client stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Start { reply } => self.handle_start(reply),
            Command::Answer {
                question_index,
                selected_index,
                reply,
            } => self.handle_answer(question_index, selected_index, reply),
            Command::End { reply } => {
                let ended = self.machine.end(self.clock.now());
                if ended {
                    self.timer.cancel();
                }
                let _ = reply.send(ended);
            }
            Command::Restart { reply } => {
                let restarted = self.machine.restart();
                if restarted {
                    self.timer.clear_remaining();
                }
                let _ = reply.send(restarted);
            }
            Command::SetPlayerName { name } => self.machine.set_player_name(name),
            Command::Finalize { reply } => self.handle_finalize(reply),
            Command::RefreshLeaderboard { reply } => {
                self.fetch_leaderboard(LeaderboardWaiter::Refresh(reply));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {
                info!("quiz client shutting down");
                return false;
            }
        }
        true
    }

    // -- Requests ---------------------------------------------------------

    /// Run `call` against the backend in its own task and post the
    /// completion it builds back to the actor.
    fn spawn_request<F, Fut, T, D>(&self, call: F, complete: D)
    where
        F: FnOnce(Arc<B>) -> Fut,
        D: FnOnce(T) -> Completion + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let fut = call(Arc::clone(&self.backend));
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = fut.await;
            // The actor only goes away on shutdown; a late result is moot.
            let _ = tx.send(complete(result));
        });
    }

    fn handle_start(&mut self, reply: oneshot::Sender<Result<SessionId, BlitzError>>) {
        if let Err(e) = self.machine.begin_start() {
            debug!(error = %e, "start refused");
            let _ = reply.send(Err(e.into()));
            return;
        }
        self.spawn_request(
            |backend| async move { backend.start_session().await },
            |result| Completion::Started { result, reply },
        );
    }

    fn handle_answer(
        &mut self,
        question_index: u32,
        selected_index: u32,
        reply: oneshot::Sender<AnswerOutcome>,
    ) {
        let request = match self.machine.begin_answer(question_index, selected_index) {
            Ok(request) => request,
            Err(reason) => {
                debug!(question_index, selected_index, %reason, "answer ignored");
                let _ = reply.send(AnswerOutcome::Ignored(reason));
                return;
            }
        };
        let session_id = request.session_id.clone();
        debug!(%session_id, question_index, selected_index, "submitting answer");
        self.spawn_request(
            |backend| async move { backend.submit_answer(request).await },
            move |result| Completion::Answered {
                session_id,
                question_index,
                result,
                reply,
            },
        );
    }

    fn handle_finalize(&mut self, reply: oneshot::Sender<FinalizeOutcome>) {
        let Some(request) = self.machine.begin_finalize() else {
            debug!(stage = %self.machine.stage(), "finalize skipped");
            let _ = reply.send(FinalizeOutcome::Skipped);
            return;
        };
        let Some(session_id) = self.machine.session().map(|s| s.id().clone()) else {
            // begin_finalize only succeeds in Results, which holds a session.
            let _ = reply.send(FinalizeOutcome::Skipped);
            return;
        };
        self.spawn_request(
            |backend| async move { backend.finalize(request).await },
            move |result| Completion::Finalized {
                session_id,
                result,
                reply,
            },
        );
    }

    fn fetch_leaderboard(&self, waiter: LeaderboardWaiter) {
        self.spawn_request(
            |backend| async move { backend.fetch_leaderboard().await },
            |result| Completion::Leaderboard { result, waiter },
        );
    }

    // -- Completions ------------------------------------------------------

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Started { result, reply } => {
                let _ = reply.send(self.on_started(result));
            }
            Completion::Answered {
                session_id,
                question_index,
                result,
                reply,
            } => {
                let outcome = self.on_answered(&session_id, question_index, result);
                let _ = reply.send(outcome);
            }
            Completion::Finalized {
                session_id,
                result,
                reply,
            } => {
                let accepted = match result {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            operation = %Operation::Finalize,
                            %session_id,
                            error = %e,
                            "finalize failed — ignoring"
                        );
                        false
                    }
                };
                self.fetch_leaderboard(LeaderboardWaiter::Finalize {
                    session_id,
                    accepted,
                    reply,
                });
            }
            Completion::Leaderboard { result, waiter } => {
                let outcome = self.leaderboard.apply(result, self.clock.now());
                match waiter {
                    LeaderboardWaiter::Nobody => {}
                    LeaderboardWaiter::Refresh(reply) => {
                        let _ = reply.send(outcome);
                    }
                    LeaderboardWaiter::Finalize {
                        session_id,
                        accepted,
                        reply,
                    } => {
                        self.machine.complete_finalize(&session_id);
                        let _ = reply.send(FinalizeOutcome::Submitted {
                            accepted,
                            leaderboard: outcome,
                        });
                    }
                }
            }
        }
    }

    fn on_started(
        &mut self,
        result: Result<StartSessionResponse, BackendError>,
    ) -> Result<SessionId, BlitzError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(operation = %Operation::StartSession, error = %e, "session start failed");
                self.machine.fail_start();
                self.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };
        match self.machine.complete_start(response, self.clock.now()) {
            Ok(session) => {
                let id = session.id().clone();
                let expires_at = session.expires_at();
                self.timer.arm(id.clone(), expires_at);
                self.last_error = None;
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "session start rejected");
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn on_answered(
        &mut self,
        session_id: &SessionId,
        question_index: u32,
        result: Result<AnswerResponse, BackendError>,
    ) -> AnswerOutcome {
        match result {
            Ok(response) => {
                if self.machine.complete_answer(session_id, question_index, response) {
                    AnswerOutcome::Scored {
                        score: response.score,
                        streak: response.streak,
                    }
                } else {
                    AnswerOutcome::Stale
                }
            }
            Err(e) => {
                warn!(
                    operation = %Operation::SubmitAnswer,
                    %session_id,
                    question_index,
                    error = %e,
                    "answer submission failed — question left open"
                );
                self.machine.fail_answer(session_id, question_index);
                AnswerOutcome::Failed
            }
        }
    }

    // -- Countdown --------------------------------------------------------

    fn handle_countdown(&mut self, event: CountdownEvent<SessionId>) {
        match event {
            CountdownEvent::Expired { key } => {
                if self.machine.expire(&key, self.clock.now()) {
                    self.timer.cancel();
                }
            }
        }
    }

    // -- Snapshot ---------------------------------------------------------

    fn snapshot(&self) -> Snapshot {
        let machine = &self.machine;
        let session = machine.session();

        let remaining_secs = match machine.stage() {
            Stage::Intro => 0,
            Stage::Playing => session
                .map_or(0, |s| remaining_secs(s.expires_at(), self.clock.now())),
            Stage::Results => machine.remaining_at_end().unwrap_or(0),
        };
        let questions = session
            .map(|s| {
                s.questions()
                    .iter()
                    .map(|q| QuestionView {
                        question: q.clone(),
                        answered: s.answered().is_answered(q.index),
                        in_flight: s.answered().is_in_flight(q.index),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Snapshot {
            stage: machine.stage(),
            session_id: session.map(|s| s.id().clone()),
            remaining_secs,
            score: machine.score(),
            streak: machine.streak(),
            questions,
            leaderboard: self
                .leaderboard
                .top(machine.config().leaderboard_top_n)
                .to_vec(),
            start_pending: machine.is_start_pending(),
            submitting: machine.is_submitting(),
            player_name: machine.player_name().to_string(),
            reported_duration_secs: machine.reported_duration_secs(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Spawns a new client task and returns a handle to communicate with it.
///
/// `channel_size` controls backpressure on commands; completions and
/// countdown events are unbounded since the actor itself produces them.
pub(crate) fn spawn_client<B: Backend>(
    config: QuizConfig,
    clock: Arc<dyn Clock>,
    backend: Arc<B>,
    channel_size: usize,
) -> QuizHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();

    let timer = CountdownTimer::new(config.countdown, Arc::clone(&clock), events_tx);
    let remaining = timer.subscribe();

    let client = QuizClient {
        backend,
        clock,
        machine: SessionMachine::new(config),
        leaderboard: LeaderboardCache::new(),
        timer,
        last_error: None,
        commands: rx,
        countdown_events: events_rx,
        completions: completions_rx,
        completions_tx,
    };

    tokio::spawn(client.run());

    QuizHandle::new(tx, remaining)
}
