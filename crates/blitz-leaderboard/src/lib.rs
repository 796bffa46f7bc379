//! Leaderboard cache for Arcane Blitz.
//!
//! Holds the last ranked list fetched from the backend. A refresh
//! replaces the list wholesale; a failed refresh keeps whatever was
//! there before. Nothing in this crate ever reports an error upward:
//! the leaderboard is decoration, and a stale one is better than none.

mod cache;

pub use cache::{LeaderboardCache, RefreshOutcome};
