use serde::{Deserialize, Serialize};

use crate::aggregate::{Percentage, Progress};
use crate::model::ids::UserId;

/// Derived, read-only ranking row for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub completed_count: u32,
    pub total_count: u32,
    pub completion_percentage: Percentage,
}

impl LeaderboardEntry {
    /// Build an entry from per-user counts using the shared progress formula.
    #[must_use]
    pub fn from_counts(
        user_id: UserId,
        display_name: impl Into<String>,
        completed_count: u32,
        total_count: u32,
    ) -> Self {
        let progress = Progress::from_counts(completed_count, total_count);
        Self {
            user_id,
            display_name: display_name.into(),
            completed_count: progress.completed_count,
            total_count: progress.total_count,
            completion_percentage: progress.percentage,
        }
    }
}

/// Presentation rank derived purely from list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    First,
    Second,
    Third,
    Nth(usize),
}

impl Placement {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::First,
            1 => Self::Second,
            2 => Self::Third,
            n => Self::Nth(n + 1),
        }
    }

    /// One-based rank number.
    #[must_use]
    pub fn number(self) -> usize {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Nth(n) => n,
        }
    }

    #[must_use]
    pub fn is_podium(self) -> bool {
        !matches!(self, Self::Nth(_))
    }
}

/// A leaderboard entry paired with its placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub placement: Placement,
    pub entry: LeaderboardEntry,
}

/// Pair entries with placements, keeping the incoming order untouched.
#[must_use]
pub fn assign_placements(entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            placement: Placement::from_index(index),
            entry,
        })
        .collect()
}
