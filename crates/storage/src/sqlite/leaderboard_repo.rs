use study_core::model::LeaderboardEntry;

use super::SqliteRepository;
use super::mapping::{db_err, map_leaderboard_row};
use crate::repository::{LeaderboardRepository, StorageError};

#[async_trait::async_trait]
impl LeaderboardRepository for SqliteRepository {
    async fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, display_name, completed_topics, total_topics, completion_percentage
            FROM leaderboard
            ORDER BY completion_percentage DESC, completed_topics DESC, created_at ASC, user_id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_leaderboard_row).collect()
    }
}
