use study_core::model::{NewTopic, Section, Topic, TopicId};

use super::SqliteRepository;
use super::mapping::{db_err, map_section_row, map_topic_row, ser};
use crate::changes::ChangeNotice;
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn list_sections(&self) -> Result<Vec<Section>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, emoji, display_order
            FROM sections
            ORDER BY display_order ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_section_row).collect()
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT t.id, t.section_id, t.text, t.display_order
            FROM topics t
            JOIN sections s ON s.id = t.section_id
            ORDER BY s.display_order ASC, t.display_order ASC, t.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_topic_row).collect()
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sections (id, title, emoji, display_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                emoji = excluded.emoji,
                display_order = excluded.display_order
            ",
        )
        .bind(section.id().to_string())
        .bind(section.title())
        .bind(section.emoji())
        .bind(section.order())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.changes.publish(ChangeNotice::Catalog);
        Ok(())
    }

    async fn append_topic(&self, id: TopicId, topic: &NewTopic) -> Result<Topic, StorageError> {
        // Order assignment and insert happen in one statement so concurrent
        // appends to the same section cannot both read the same maximum.
        let row = sqlx::query(
            r"
            INSERT INTO topics (id, section_id, text, display_order)
            SELECT ?1, s.id, ?3,
                   COALESCE((SELECT MAX(display_order) FROM topics WHERE section_id = s.id), 0) + 1
            FROM sections s
            WHERE s.id = ?2
            RETURNING display_order
            ",
        )
        .bind(id.to_string())
        .bind(topic.section_id().to_string())
        .bind(topic.text().as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        let order: i64 = sqlx::Row::try_get(&row, "display_order").map_err(ser)?;
        tracing::debug!(topic_id = %id, section_id = %topic.section_id(), order, "appended topic");
        self.changes.publish(ChangeNotice::Catalog);
        Ok(Topic::new(id, topic.section_id(), topic.text().clone(), order))
    }
}
