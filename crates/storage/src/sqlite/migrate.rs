use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migrations in order, recording each applied version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: catalog, profiles, roles and progress marks.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sections (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    emoji TEXT NOT NULL,
                    display_order INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topics (
                    id TEXT PRIMARY KEY,
                    section_id TEXT NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
                    text TEXT NOT NULL CHECK (length(text) BETWEEN 1 AND 500),
                    display_order INTEGER NOT NULL,
                    UNIQUE (section_id, display_order)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    user_id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_roles (
                    user_id TEXT NOT NULL REFERENCES profiles(user_id) ON DELETE CASCADE,
                    role TEXT NOT NULL CHECK (role IN ('admin')),
                    PRIMARY KEY (user_id, role)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_progress (
                    user_id TEXT NOT NULL,
                    topic_id TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
                    completed_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, topic_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_user_progress_topic
                    ON user_progress (topic_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied migration");
    }

    // Version 2: derived leaderboard view over profiles, topics and marks.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE VIEW IF NOT EXISTS leaderboard AS
                WITH totals AS (
                    SELECT COUNT(*) AS total_topics FROM topics
                ),
                done AS (
                    SELECT up.user_id, COUNT(*) AS completed_topics
                    FROM user_progress up
                    JOIN topics t ON t.id = up.topic_id
                    GROUP BY up.user_id
                )
                SELECT
                    p.user_id,
                    p.display_name,
                    p.created_at,
                    COALESCE(d.completed_topics, 0) AS completed_topics,
                    totals.total_topics AS total_topics,
                    CASE
                        WHEN totals.total_topics = 0 THEN 0.0
                        ELSE COALESCE(d.completed_topics, 0) * 100.0 / totals.total_topics
                    END AS completion_percentage
                FROM profiles p
                CROSS JOIN totals
                LEFT JOIN done d ON d.user_id = p.user_id;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(2_i64)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(version = 2, "applied migration");
    }

    Ok(())
}
