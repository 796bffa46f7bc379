use blitz_backend::{Backend, BackendError, Operation};
use blitz_countdown::Clock;
use blitz_protocol::{LeaderboardEntry, LeaderboardResponse};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// What a refresh did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The list was replaced; holds the new entry count.
    Updated(usize),
    /// The fetch failed and the previous list was kept.
    Stale,
}

/// The last successfully fetched leaderboard.
///
/// Entries keep the backend's order. The cache may hold more rows than
/// are shown; [`top`](Self::top) truncates for display.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardCache {
    entries: Vec<LeaderboardEntry>,
    last_refreshed: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

impl LeaderboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cached row, best first.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// At most `n` rows from the top.
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the list was last replaced. `None` until the first success.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Failed refreshes since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Fetch the list from `backend` and apply the result.
    ///
    /// Never fails: on error the previous list is kept and
    /// [`RefreshOutcome::Stale`] is returned.
    pub async fn refresh<B, C>(&mut self, backend: &B, clock: &C) -> RefreshOutcome
    where
        B: Backend,
        C: Clock + ?Sized,
    {
        let result = backend.fetch_leaderboard().await;
        self.apply(result, clock.now())
    }

    /// Apply the result of a fetch performed elsewhere (e.g. in a
    /// spawned task).
    pub fn apply(
        &mut self,
        result: Result<LeaderboardResponse, BackendError>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        match result {
            Ok(response) => self.replace(response.items, now),
            Err(e) => self.record_failure(&e),
        }
    }

    /// Swap in a freshly fetched list.
    pub fn replace(
        &mut self,
        entries: Vec<LeaderboardEntry>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        let count = entries.len();
        self.entries = entries;
        self.last_refreshed = Some(now);
        self.consecutive_failures = 0;
        debug!(entries = count, "leaderboard refreshed");
        RefreshOutcome::Updated(count)
    }

    /// Note a failed fetch. The cached list is left as it was.
    pub fn record_failure(&mut self, error: &BackendError) -> RefreshOutcome {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        warn!(
            operation = %Operation::FetchLeaderboard,
            error = %error,
            consecutive_failures = self.consecutive_failures,
            kept = self.entries.len(),
            "leaderboard refresh failed — keeping cached list"
        );
        RefreshOutcome::Stale
    }
}
