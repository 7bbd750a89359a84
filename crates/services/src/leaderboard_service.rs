use std::sync::Arc;

use storage::repository::LeaderboardRepository;
use study_core::model::{RankedEntry, assign_placements};

use crate::error::LeaderboardError;

/// What the leaderboard screen renders: ranked rows, or nothing plus the
/// reason the fetch failed.
#[derive(Debug, Default)]
pub struct LeaderboardSnapshot {
    pub entries: Vec<RankedEntry>,
    pub error: Option<LeaderboardError>,
}

impl LeaderboardSnapshot {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ranks users by completion. Ordering comes from the store and is never
/// changed here; only placements are added.
#[derive(Clone)]
pub struct LeaderboardService {
    leaderboard: Arc<dyn LeaderboardRepository>,
    default_limit: u32,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(leaderboard: Arc<dyn LeaderboardRepository>, default_limit: u32) -> Self {
        Self {
            leaderboard,
            default_limit,
        }
    }

    #[must_use]
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Fetch up to `limit` ranked entries.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if the leaderboard cannot be read.
    pub async fn fetch(&self, limit: u32) -> Result<Vec<RankedEntry>, LeaderboardError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        tracing::debug!(limit, "fetching leaderboard");
        let entries = self.leaderboard.top_entries(limit).await?;
        Ok(assign_placements(entries))
    }

    /// Up to `limit` ranked entries; a failed fetch yields no entries and
    /// carries the error instead.
    pub async fn top_entries(&self, limit: u32) -> LeaderboardSnapshot {
        match self.fetch(limit).await {
            Ok(entries) => LeaderboardSnapshot {
                entries,
                error: None,
            },
            Err(err) => {
                tracing::warn!(limit, error = %err, "leaderboard unavailable");
                LeaderboardSnapshot {
                    entries: Vec::new(),
                    error: Some(err),
                }
            }
        }
    }

    /// `top_entries` with the configured limit.
    pub async fn top(&self) -> LeaderboardSnapshot {
        self.top_entries(self.default_limit).await
    }
}
