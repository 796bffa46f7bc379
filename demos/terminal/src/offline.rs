//! In-process backend so the demo runs without a quiz server.

use std::collections::HashMap;
use std::sync::Mutex;

use blitz::prelude::*;
use blitz::protocol::{
    AnswerRequest, AnswerResponse, FinalizeRequest, LeaderboardResponse,
    StartSessionResponse,
};
use chrono::TimeDelta;
use rand::Rng;
use rand::seq::SliceRandom;

const QUESTIONS_PER_ROUND: usize = 5;

/// (prompt, options, correct option)
const BANK: &[(&str, &[&str], u32)] = &[
    ("Which school of magic deals with fire?", &["Abjuration", "Evocation", "Divination", "Illusion"], 1),
    ("A wyvern has how many legs?", &["Two", "Four", "Six", "None"], 0),
    ("What metal wards off fey?", &["Gold", "Silver", "Cold iron", "Copper"], 2),
    ("Which potion restores mana?", &["Red", "Green", "Blue", "Black"], 2),
    ("A lich stores its soul in a...", &["Grimoire", "Phylactery", "Crown", "Staff"], 1),
    ("Which rune means 'shield'?", &["Algiz", "Fehu", "Thurisaz", "Ansuz"], 0),
    ("What do basilisks do with a gaze?", &["Heal", "Charm", "Petrify", "Blind"], 2),
    ("Which familiar sees in the dark?", &["Toad", "Owl", "Raven", "Cat"], 1),
];

#[derive(Default)]
struct Round {
    /// Correct option per question index.
    key: HashMap<u32, u32>,
    score: u32,
    streak: u32,
}

/// Keeps rounds and the leaderboard in memory. Scoring: 100 points per
/// correct answer plus 20 per answer already in the streak.
pub struct OfflineBackend {
    round_length: TimeDelta,
    rounds: Mutex<HashMap<SessionId, Round>>,
    board: Mutex<Vec<LeaderboardEntry>>,
}

impl OfflineBackend {
    pub fn new(round_secs: u32) -> Self {
        Self {
            round_length: TimeDelta::seconds(i64::from(round_secs)),
            rounds: Mutex::new(HashMap::new()),
            board: Mutex::new(Vec::new()),
        }
    }

    fn new_round(&self) -> (SessionId, Round, Vec<Question>) {
        let mut rng = rand::rng();
        let id = SessionId::from(format!("offline-{:016x}", rng.random::<u64>()));

        let mut picks: Vec<usize> = (0..BANK.len()).collect();
        picks.shuffle(&mut rng);

        let mut round = Round::default();
        let questions = picks
            .into_iter()
            .take(QUESTIONS_PER_ROUND)
            .zip(0u32..)
            .map(|(pick, index)| {
                let (prompt, options, correct) = BANK[pick];
                round.key.insert(index, correct);
                Question {
                    index,
                    prompt: prompt.to_string(),
                    options: options.iter().map(|o| o.to_string()).collect(),
                }
            })
            .collect();
        (id, round, questions)
    }
}

fn unknown_session(id: &SessionId) -> BackendError {
    BackendError::Unavailable(format!("unknown session {id}"))
}

impl Backend for OfflineBackend {
    async fn start_session(&self) -> Result<StartSessionResponse, BackendError> {
        let (session_id, round, questions) = self.new_round();
        self.rounds
            .lock()
            .map_err(|_| BackendError::Unavailable("state poisoned".into()))?
            .insert(session_id.clone(), round);
        Ok(StartSessionResponse {
            session_id,
            ends_at: chrono::Utc::now() + self.round_length,
            questions,
        })
    }

    async fn submit_answer(
        &self,
        request: AnswerRequest,
    ) -> Result<AnswerResponse, BackendError> {
        let mut rounds = self
            .rounds
            .lock()
            .map_err(|_| BackendError::Unavailable("state poisoned".into()))?;
        let round = rounds
            .get_mut(&request.session_id)
            .ok_or_else(|| unknown_session(&request.session_id))?;

        if round.key.get(&request.question_index) == Some(&request.selected_index) {
            round.score += 100 + 20 * round.streak;
            round.streak += 1;
        } else {
            round.streak = 0;
        }
        Ok(AnswerResponse {
            score: round.score,
            streak: round.streak,
        })
    }

    async fn finalize(&self, request: FinalizeRequest) -> Result<(), BackendError> {
        let mut board = self
            .board
            .lock()
            .map_err(|_| BackendError::Unavailable("state poisoned".into()))?;
        board.push(LeaderboardEntry {
            player_name: request.player_name,
            score: request.score,
            duration_seconds: request.duration_seconds,
            streak: request.streak,
        });
        board.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.duration_seconds.cmp(&b.duration_seconds))
        });
        Ok(())
    }

    async fn fetch_leaderboard(&self) -> Result<LeaderboardResponse, BackendError> {
        let board = self
            .board
            .lock()
            .map_err(|_| BackendError::Unavailable("state poisoned".into()))?;
        Ok(LeaderboardResponse {
            items: board.clone(),
        })
    }
}
