use std::time::Duration;

use blitz::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod offline;

use offline::OfflineBackend;

const HELP: &str = "\
commands:
  start                 begin a round
  answer <q> <choice>   answer question q with option 0-3 (or A-D)
  end                   end the round early
  name <text>           set the player name
  finalize [name]       submit the score
  restart               back to the intro
  board                 refresh and show the leaderboard
  show                  print the current state
  quit";

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

struct Args {
    offline: bool,
    json: bool,
    round_secs: u32,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        offline: false,
        json: false,
        round_secs: 60,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--offline" => args.offline = true,
            "--json" => args.json = true,
            "--round" => {
                args.round_secs = iter
                    .next()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .ok_or("--round needs a positive number of seconds")?;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(snap: &Snapshot, json: bool) {
    if json {
        match serde_json::to_string_pretty(snap) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("cannot encode snapshot: {e}"),
        }
        return;
    }

    match snap.stage {
        Stage::Intro => {
            println!("== Arcane Blitz ==  (type `start`)");
            render_board(&snap.leaderboard);
        }
        Stage::Playing => {
            println!(
                "[{}]  score {}  streak {}",
                format_mm_ss(snap.remaining_secs),
                snap.score,
                snap.streak
            );
            for view in &snap.questions {
                let mark = if view.answered {
                    "x"
                } else if view.in_flight {
                    "…"
                } else {
                    " "
                };
                println!("  [{mark}] {}. {}", view.question.index, view.question.prompt);
                for (pos, option) in view.question.options.iter().enumerate() {
                    println!("        {}) {option}", Question::option_label(pos));
                }
            }
        }
        Stage::Results => {
            println!(
                "round over: score {}  streak {}  time {}s",
                snap.score,
                snap.streak,
                snap.reported_duration_secs.unwrap_or(0)
            );
            if snap.submitting {
                println!("submitting…");
            } else {
                println!("`finalize <name>` to join the leaderboard, `restart` to go again");
            }
            render_board(&snap.leaderboard);
        }
    }
    if let Some(err) = &snap.last_error {
        println!("last error: {err}");
    }
}

fn render_board(entries: &[LeaderboardEntry]) {
    if entries.is_empty() {
        println!("  (leaderboard empty)");
        return;
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {:<16} {:>6}  {:>4}s  streak {}",
            rank + 1,
            entry.display_name(),
            entry.score,
            entry.duration_seconds,
            entry.streak
        );
    }
}

/// Accepts `2` or `C`.
fn parse_choice(s: &str) -> Option<u32> {
    if let Ok(n) = s.parse() {
        return Some(n);
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(c.to_ascii_uppercase() as u32 - 'A' as u32)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

async fn run(quiz: QuizHandle, json: bool) -> Result<(), BlitzError> {
    // Tell the player when the clock runs out without waiting for input.
    let mut remaining = quiz.watch_remaining();
    tokio::spawn(async move {
        let mut last = 0;
        while remaining.changed().await.is_ok() {
            let now = *remaining.borrow_and_update();
            if now == 0 && last > 0 {
                println!("\n*** time's up! (`show` for results) ***");
            }
            last = now;
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let rest: Vec<&str> = words.collect();

        match (cmd, rest.as_slice()) {
            ("start", []) => match quiz.start().await {
                Ok(id) => {
                    info!(session_id = %id, "round started");
                    render(&quiz.snapshot().await?, json);
                }
                Err(e) => println!("could not start: {e}"),
            },
            ("answer", [q, choice]) => {
                let (Ok(q), Some(choice)) = (q.parse(), parse_choice(choice)) else {
                    println!("usage: answer <q> <choice>");
                    continue;
                };
                match quiz.answer(q, choice).await? {
                    AnswerOutcome::Scored { score, streak } => {
                        println!("scored: {score} (streak {streak})");
                    }
                    AnswerOutcome::Ignored(reason) => println!("ignored: {reason}"),
                    AnswerOutcome::Failed => println!("answer not recorded, try again"),
                    AnswerOutcome::Stale => println!("that round is gone"),
                }
            }
            ("end", []) => {
                if quiz.end().await? {
                    render(&quiz.snapshot().await?, json);
                }
            }
            ("name", words) if !words.is_empty() => {
                quiz.set_player_name(words.join(" ")).await?;
            }
            ("finalize", words) => {
                if !words.is_empty() {
                    quiz.set_player_name(words.join(" ")).await?;
                }
                match quiz.finalize().await? {
                    FinalizeOutcome::Skipped => {
                        println!("nothing sent (round still running, or no name)");
                    }
                    FinalizeOutcome::Submitted { accepted, .. } => {
                        if !accepted {
                            println!("score could not be saved");
                        }
                        render(&quiz.snapshot().await?, json);
                    }
                }
            }
            ("restart", []) => {
                if quiz.restart().await? {
                    render(&quiz.snapshot().await?, json);
                }
            }
            ("board", []) => {
                if quiz.refresh_leaderboard().await? == RefreshOutcome::Stale {
                    println!("(leaderboard unavailable, showing cached)");
                }
                render_board(&quiz.snapshot().await?.leaderboard);
            }
            ("show", []) => render(&quiz.snapshot().await?, json),
            ("quit" | "exit", []) => break,
            ("help", _) => println!("{HELP}"),
            _ => println!("unknown command; `help` lists them"),
        }
    }

    quiz.shutdown().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let builder = QuizHandle::builder();

    let quiz = if args.offline {
        info!(round_secs = args.round_secs, "running offline");
        builder.build(OfflineBackend::new(args.round_secs))
    } else {
        let config = HttpBackendConfig::from_env();
        info!(base_url = %config.base_url, "using quiz backend");
        builder.build(HttpBackend::new(config)?)
    };

    run(quiz, args.json).await?;
    Ok(())
}
