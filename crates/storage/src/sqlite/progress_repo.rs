use sqlx::Row;
use study_core::model::{CompletedSet, ProgressMark, TopicId, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, parse_id, ser};
use crate::changes::ChangeNotice;
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn list_marks(&self, user_id: UserId) -> Result<CompletedSet, StorageError> {
        let rows = sqlx::query("SELECT topic_id FROM user_progress WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("topic_id").map_err(ser)?;
                parse_id::<TopicId>("topic id", &raw)
            })
            .collect()
    }

    async fn insert_mark(&self, mark: &ProgressMark) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, topic_id, completed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, topic_id) DO NOTHING
            ",
        )
        .bind(mark.user_id.to_string())
        .bind(mark.topic_id.to_string())
        .bind(mark.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.changes.publish(ChangeNotice::Progress {
            user_id: mark.user_id,
        });
        Ok(())
    }

    async fn delete_mark(&self, user_id: UserId, topic_id: TopicId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM user_progress WHERE user_id = ?1 AND topic_id = ?2")
            .bind(user_id.to_string())
            .bind(topic_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        self.changes.publish(ChangeNotice::Progress { user_id });
        Ok(())
    }
}
