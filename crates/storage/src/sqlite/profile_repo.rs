use study_core::model::{Email, Profile, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, map_profile_row};
use crate::changes::ChangeNotice;
use crate::repository::{ProfileRepository, RoleRepository, StorageError};

const ADMIN_ROLE: &str = "admin";

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, display_name, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email
            ",
        )
        .bind(profile.user_id().to_string())
        .bind(profile.display_name())
        .bind(profile.email().as_str())
        .bind(profile.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.changes.publish(ChangeNotice::Users);
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, email, created_at FROM profiles WHERE user_id = ?1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, email, created_at FROM profiles WHERE email = ?1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, display_name, email, created_at
            FROM profiles
            ORDER BY created_at DESC, user_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_profile_row).collect()
    }
}

#[async_trait::async_trait]
impl RoleRepository for SqliteRepository {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM user_roles WHERE user_id = ?1 AND role = ?2")
            .bind(user_id.to_string())
            .bind(ADMIN_ROLE)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn grant_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role)
            VALUES (?1, ?2)
            ON CONFLICT(user_id, role) DO NOTHING
            ",
        )
        .bind(user_id.to_string())
        .bind(ADMIN_ROLE)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let granted = res.rows_affected() > 0;
        if granted {
            self.changes.publish(ChangeNotice::Users);
        }
        Ok(granted)
    }
}
