//! End-to-end tests for the quiz client actor against a mock backend.
//!
//! Time is paused (`start_paused`), and both the client and the mock
//! read a `TokioClock` anchored at the same wall instant, so deadlines
//! and elapsed times are exact.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blitz::prelude::*;
use blitz::countdown::TokioClock;
use blitz::protocol::{
    AnswerRequest, AnswerResponse, FinalizeRequest, LeaderboardResponse,
    StartSessionResponse,
};
use blitz::session::SessionError;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::time;

// =========================================================================
// Mock backend
// =========================================================================

/// In-process backend with scripted latency and failures.
///
/// Every `fail_*` flag fails the next call of that kind only.
struct MockBackend {
    clock: TokioClock,
    round: Mutex<TimeDelta>,
    start_latency: Mutex<Duration>,
    answer_latency: Mutex<Duration>,
    fail_start: AtomicBool,
    fail_answer: AtomicBool,
    fail_finalize: AtomicBool,
    fail_leaderboard: AtomicBool,
    board: Mutex<Vec<LeaderboardEntry>>,
    finalized: Mutex<Vec<FinalizeRequest>>,
    starts: AtomicUsize,
    answers: AtomicUsize,
    finalizes: AtomicUsize,
    fetches: AtomicUsize,
    scored: AtomicU32,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            clock: TokioClock::anchored_at(t0()),
            round: Mutex::new(TimeDelta::seconds(300)),
            start_latency: Mutex::new(Duration::ZERO),
            answer_latency: Mutex::new(Duration::ZERO),
            fail_start: AtomicBool::new(false),
            fail_answer: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
            fail_leaderboard: AtomicBool::new(false),
            board: Mutex::new(Vec::new()),
            finalized: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            answers: AtomicUsize::new(0),
            finalizes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            scored: AtomicU32::new(0),
        })
    }

    fn set_round(&self, secs: i64) {
        *self.round.lock().unwrap() = TimeDelta::seconds(secs);
    }

    fn set_board(&self, entries: Vec<LeaderboardEntry>) {
        *self.board.lock().unwrap() = entries;
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    async fn start_session(&self) -> Result<StartSessionResponse, BackendError> {
        let latency = *self.start_latency.lock().unwrap();
        time::sleep(latency).await;
        let n = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Unavailable("start refused".into()));
        }
        self.scored.store(0, Ordering::SeqCst);
        let round = *self.round.lock().unwrap();
        Ok(StartSessionResponse {
            session_id: SessionId::from(format!("s-{n}")),
            ends_at: self.clock.now() + round,
            questions: (0..5)
                .map(|index| Question {
                    index,
                    prompt: format!("question {index}"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                })
                .collect(),
        })
    }

    async fn submit_answer(
        &self,
        _request: AnswerRequest,
    ) -> Result<AnswerResponse, BackendError> {
        let latency = *self.answer_latency.lock().unwrap();
        time::sleep(latency).await;
        self.answers.fetch_add(1, Ordering::SeqCst);
        if self.fail_answer.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Unavailable("answer dropped".into()));
        }
        let n = self.scored.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AnswerResponse {
            score: 100 * n,
            streak: n,
        })
    }

    async fn finalize(&self, request: FinalizeRequest) -> Result<(), BackendError> {
        self.finalizes.fetch_add(1, Ordering::SeqCst);
        if self.fail_finalize.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Unavailable("finalize dropped".into()));
        }
        self.finalized.lock().unwrap().push(request.clone());
        self.board.lock().unwrap().insert(
            0,
            LeaderboardEntry {
                player_name: request.player_name,
                score: request.score,
                duration_seconds: request.duration_seconds,
                streak: request.streak,
            },
        );
        Ok(())
    }

    async fn fetch_leaderboard(&self) -> Result<LeaderboardResponse, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_leaderboard.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Unavailable("leaderboard down".into()));
        }
        Ok(LeaderboardResponse {
            items: self.board.lock().unwrap().clone(),
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
}

fn client_with(mock: &Arc<MockBackend>, config: QuizConfig) -> QuizHandle {
    QuizHandle::builder()
        .config(config)
        .clock(TokioClock::anchored_at(t0()))
        .build(Arc::clone(mock))
}

fn client(mock: &Arc<MockBackend>) -> QuizHandle {
    client_with(mock, QuizConfig::default())
}

/// Let every runnable task finish. Paused time only auto-advances once
/// the runtime is idle, so this drains pending completions.
async fn settle() {
    time::sleep(Duration::from_millis(1)).await;
}

fn entry(name: &str, score: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        player_name: name.into(),
        score,
        duration_seconds: 120,
        streak: 3,
    }
}

// =========================================================================
// Startup and leaderboard
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leaderboard_loaded_on_startup() {
    let mock = MockBackend::new();
    mock.set_board(vec![entry("Ana", 900), entry("Bo", 700)]);
    let quiz = client(&mock);
    settle().await;

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Intro);
    assert_eq!(snap.leaderboard, vec![entry("Ana", 900), entry("Bo", 700)]);
    assert_eq!(MockBackend::count(&mock.fetches), 1);
    assert_eq!(MockBackend::count(&mock.starts), 0, "load must not start a round");
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_failure_keeps_prior_list() {
    let mock = MockBackend::new();
    mock.set_board(vec![entry("Ana", 900), entry("Bo", 700)]);
    let quiz = client(&mock);
    settle().await;

    mock.set_board(vec![entry("Zed", 1)]);
    mock.fail_leaderboard.store(true, Ordering::SeqCst);
    assert_eq!(
        quiz.refresh_leaderboard().await.unwrap(),
        RefreshOutcome::Stale
    );

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.leaderboard, vec![entry("Ana", 900), entry("Bo", 700)]);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_shows_top_n_rows() {
    let mock = MockBackend::new();
    mock.set_board((0..15).map(|i| entry("p", 1_000 - i)).collect());
    let quiz = client_with(
        &mock,
        QuizConfig {
            leaderboard_top_n: 3,
            ..QuizConfig::default()
        },
    );

    assert_eq!(
        quiz.refresh_leaderboard().await.unwrap(),
        RefreshOutcome::Updated(15)
    );
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.leaderboard.len(), 3);
    assert_eq!(snap.leaderboard[0].score, 1_000);
}

// =========================================================================
// Start
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_enters_playing() {
    let mock = MockBackend::new();
    let quiz = client(&mock);

    let id = quiz.start().await.unwrap();
    assert_eq!(id, SessionId::from("s-1"));

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Playing);
    assert_eq!(snap.session_id, Some(id));
    assert_eq!(snap.remaining_secs, 300);
    assert_eq!(snap.score, 0);
    assert_eq!(snap.questions.len(), 5);
    assert!(snap.questions.iter().all(|q| !q.answered && !q.in_flight));
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_is_reported_and_retryable() {
    let mock = MockBackend::new();
    let quiz = client(&mock);

    mock.fail_start.store(true, Ordering::SeqCst);
    let err = quiz.start().await.unwrap_err();
    assert!(matches!(err, BlitzError::Backend(_)));

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Intro);
    assert!(!snap.start_pending);
    assert_eq!(snap.last_error.as_deref(), Some("backend unavailable: start refused"));

    quiz.start().await.expect("retry should succeed");
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Playing);
    assert_eq!(snap.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_pending_is_refused() {
    let mock = MockBackend::new();
    *mock.start_latency.lock().unwrap() = Duration::from_millis(500);
    let quiz = client(&mock);

    let first = tokio::spawn({
        let quiz = quiz.clone();
        async move { quiz.start().await }
    });
    settle().await;

    let err = quiz.start().await.unwrap_err();
    assert!(matches!(
        err,
        BlitzError::Session(SessionError::StartInProgress)
    ));
    assert!(first.await.unwrap().is_ok());
    assert_eq!(MockBackend::count(&mock.starts), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_playing_is_refused() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    let err = quiz.start().await.unwrap_err();
    assert!(matches!(
        err,
        BlitzError::Session(SessionError::InvalidTransition { .. })
    ));
    assert_eq!(MockBackend::count(&mock.starts), 1);
}

// =========================================================================
// Countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_round_expires_after_five_seconds() {
    let mock = MockBackend::new();
    mock.set_round(5);
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    time::sleep(Duration::from_secs(4)).await;
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Playing);
    assert_eq!(snap.remaining_secs, 1);

    time::sleep(Duration::from_millis(1_010)).await;
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Results);
    assert_eq!(snap.remaining_secs, 0);
    assert_eq!(snap.reported_duration_secs, Some(5));
}

#[tokio::test(start_paused = true)]
async fn test_watch_remaining_ticks_down() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    let remaining = quiz.watch_remaining();

    quiz.start().await.unwrap();
    time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(*remaining.borrow(), 299);

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(*remaining.borrow(), 289);
}

#[tokio::test(start_paused = true)]
async fn test_end_after_expiry_is_ignored() {
    let mock = MockBackend::new();
    mock.set_round(2);
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    time::sleep(Duration::from_secs(3)).await;
    assert!(!quiz.end().await.unwrap());
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Results);
    assert_eq!(snap.remaining_secs, 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_stops_countdown() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    let remaining = quiz.watch_remaining();
    quiz.start().await.unwrap();

    time::sleep(Duration::from_millis(10_500)).await;
    assert!(quiz.end().await.unwrap());
    assert!(!quiz.end().await.unwrap(), "second end is a no-op");

    // Nothing polls after the round ends.
    let frozen = *remaining.borrow();
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(*remaining.borrow(), frozen);
    assert_eq!(quiz.snapshot().await.unwrap().remaining_secs, 289);
}

// =========================================================================
// Answers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_answer_scores_once() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    assert_eq!(
        quiz.answer(0, 2).await.unwrap(),
        AnswerOutcome::Scored {
            score: 100,
            streak: 1
        }
    );
    assert_eq!(
        quiz.answer(0, 1).await.unwrap(),
        AnswerOutcome::Ignored(AnswerRejected::AlreadyAnswered)
    );
    assert_eq!(MockBackend::count(&mock.answers), 1, "resubmit must not hit the backend");

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.score, 100);
    assert_eq!(snap.streak, 1);
    assert!(snap.questions[0].answered);
}

#[tokio::test(start_paused = true)]
async fn test_answer_in_flight_blocks_second_click() {
    let mock = MockBackend::new();
    *mock.answer_latency.lock().unwrap() = Duration::from_millis(300);
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    let first = tokio::spawn({
        let quiz = quiz.clone();
        async move { quiz.answer(1, 0).await }
    });
    settle().await;

    let snap = quiz.snapshot().await.unwrap();
    assert!(snap.questions[1].in_flight);
    assert_eq!(
        quiz.answer(1, 3).await.unwrap(),
        AnswerOutcome::Ignored(AnswerRejected::InFlight)
    );

    assert!(matches!(
        first.await.unwrap().unwrap(),
        AnswerOutcome::Scored { .. }
    ));
    assert_eq!(MockBackend::count(&mock.answers), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_answer_can_be_retried() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    mock.fail_answer.store(true, Ordering::SeqCst);
    assert_eq!(quiz.answer(2, 0).await.unwrap(), AnswerOutcome::Failed);
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.score, 0);
    assert!(!snap.questions[2].answered);

    assert!(matches!(
        quiz.answer(2, 0).await.unwrap(),
        AnswerOutcome::Scored { score: 100, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_answer_outside_playing_is_ignored() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    assert_eq!(
        quiz.answer(0, 0).await.unwrap(),
        AnswerOutcome::Ignored(AnswerRejected::NoActiveSession)
    );
    assert_eq!(MockBackend::count(&mock.answers), 0);
}

#[tokio::test(start_paused = true)]
async fn test_answer_landing_after_end_still_counts() {
    let mock = MockBackend::new();
    *mock.answer_latency.lock().unwrap() = Duration::from_millis(300);
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    let pending = tokio::spawn({
        let quiz = quiz.clone();
        async move { quiz.answer(0, 0).await }
    });
    settle().await;
    assert!(quiz.end().await.unwrap());

    assert!(matches!(
        pending.await.unwrap().unwrap(),
        AnswerOutcome::Scored { .. }
    ));
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Results);
    assert_eq!(snap.score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_answer_for_discarded_session_is_stale() {
    let mock = MockBackend::new();
    *mock.answer_latency.lock().unwrap() = Duration::from_millis(300);
    let quiz = client(&mock);
    quiz.start().await.unwrap();

    let pending = tokio::spawn({
        let quiz = quiz.clone();
        async move { quiz.answer(0, 0).await }
    });
    settle().await;
    quiz.end().await.unwrap();
    quiz.restart().await.unwrap();
    quiz.start().await.unwrap();

    assert_eq!(pending.await.unwrap().unwrap(), AnswerOutcome::Stale);
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.session_id, Some(SessionId::from("s-2")));
    assert_eq!(snap.score, 0);
    assert!(!snap.questions[0].answered);
}

// =========================================================================
// Finalize
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_finalize_reports_elapsed_and_refreshes_board() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    settle().await;
    quiz.start().await.unwrap();
    quiz.answer(0, 2).await.unwrap();

    time::sleep(Duration::from_secs(255)).await;
    assert!(quiz.end().await.unwrap());
    quiz.set_player_name("  Zed  ").await.unwrap();
    assert!(quiz.snapshot().await.unwrap().can_finalize());

    let outcome = quiz.finalize().await.unwrap();
    assert_eq!(
        outcome,
        FinalizeOutcome::Submitted {
            accepted: true,
            leaderboard: RefreshOutcome::Updated(1),
        }
    );

    let sent = mock.finalized.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].player_name, "Zed");
    assert_eq!(sent[0].score, 100);
    assert_eq!(sent[0].streak, 1);
    assert_eq!(sent[0].duration_seconds, 255);

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.player_name, "");
    assert!(!snap.submitting);
    assert_eq!(snap.leaderboard[0].player_name, "Zed");
    assert_eq!(MockBackend::count(&mock.fetches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_finalize_with_blank_name_sends_nothing() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.start().await.unwrap();
    quiz.end().await.unwrap();

    quiz.set_player_name("   ").await.unwrap();
    assert_eq!(quiz.finalize().await.unwrap(), FinalizeOutcome::Skipped);
    assert_eq!(MockBackend::count(&mock.finalizes), 0);
    assert!(!quiz.snapshot().await.unwrap().submitting);
}

#[tokio::test(start_paused = true)]
async fn test_finalize_failure_is_swallowed() {
    let mock = MockBackend::new();
    mock.set_board(vec![entry("Ana", 900)]);
    let quiz = client(&mock);
    settle().await;
    quiz.start().await.unwrap();
    quiz.end().await.unwrap();

    mock.fail_finalize.store(true, Ordering::SeqCst);
    quiz.set_player_name("Zed").await.unwrap();
    let outcome = quiz.finalize().await.unwrap();
    assert_eq!(
        outcome,
        FinalizeOutcome::Submitted {
            accepted: false,
            leaderboard: RefreshOutcome::Updated(1),
        }
    );

    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Results);
    assert!(!snap.submitting);
    assert_eq!(snap.player_name, "", "name is cleared even on failure");
    assert_eq!(snap.leaderboard, vec![entry("Ana", 900)]);
}

#[tokio::test(start_paused = true)]
async fn test_finalize_while_playing_is_skipped() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.start().await.unwrap();
    quiz.set_player_name("Zed").await.unwrap();
    assert_eq!(quiz.finalize().await.unwrap(), FinalizeOutcome::Skipped);
}

// =========================================================================
// Restart and shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_restart_returns_to_intro_without_starting() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    let remaining = quiz.watch_remaining();
    quiz.start().await.unwrap();
    quiz.answer(0, 0).await.unwrap();
    quiz.end().await.unwrap();

    assert!(quiz.restart().await.unwrap());
    let snap = quiz.snapshot().await.unwrap();
    assert_eq!(snap.stage, Stage::Intro);
    assert_eq!(snap.session_id, None);
    assert_eq!(snap.score, 0);
    assert!(snap.questions.is_empty());
    assert_eq!(*remaining.borrow(), 0);
    assert_eq!(MockBackend::count(&mock.starts), 1);

    assert!(!quiz.restart().await.unwrap(), "restart from intro is a no-op");
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_serializes_stage_lowercase() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    let json = serde_json::to_value(quiz.snapshot().await.unwrap()).unwrap();
    assert_eq!(json["stage"], "intro");
    assert_eq!(json["remaining_secs"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_client() {
    let mock = MockBackend::new();
    let quiz = client(&mock);
    quiz.shutdown().await.unwrap();
    settle().await;

    assert!(matches!(
        quiz.snapshot().await,
        Err(BlitzError::ClientClosed)
    ));
}
