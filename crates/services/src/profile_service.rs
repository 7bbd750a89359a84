use std::sync::Arc;

use storage::repository::{ProfileRepository, StorageError};
use study_core::model::{Email, Profile, UserId};

use crate::Clock;
use crate::error::AdminServiceError;

/// Creates and reads the public profile that names a user on the leaderboard.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(clock: Clock, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { clock, profiles }
    }

    /// Register a profile for a freshly signed-up user.
    ///
    /// Re-registering the same user keeps the original signup time.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Profile` for a blank name or bad email.
    /// Returns `AdminServiceError::EmailTaken` if another user owns the email.
    /// Returns `AdminServiceError::Storage` if the profile cannot be written.
    pub async fn register(
        &self,
        user_id: UserId,
        display_name: &str,
        email: &str,
    ) -> Result<Profile, AdminServiceError> {
        let email = Email::parse(email)?;
        let created_at = match self.profiles.get_profile(user_id).await? {
            Some(existing) => existing.created_at(),
            None => self.clock.now(),
        };
        let profile = Profile::new(user_id, display_name, email, created_at)?;
        self.profiles
            .upsert_profile(&profile)
            .await
            .map_err(|err| match err {
                StorageError::Conflict => {
                    AdminServiceError::EmailTaken(profile.email().as_str().to_owned())
                }
                other => AdminServiceError::Storage(other),
            })?;
        tracing::info!(%user_id, "profile registered");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Storage` if the profile cannot be read.
    pub async fn get(&self, user_id: UserId) -> Result<Option<Profile>, AdminServiceError> {
        Ok(self.profiles.get_profile(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use storage::repository::InMemoryRepository;
    use study_core::ErrorKind;
    use study_core::time::{fixed_clock, fixed_now};

    use super::*;

    fn service() -> ProfileService {
        ProfileService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn register_then_rename_keeps_signup_time() {
        let service = service();
        let user = UserId::random();
        let created = service.register(user, "Ada", "ada@example.com").await.unwrap();
        assert_eq!(created.created_at(), fixed_now());

        let renamed = service.register(user, "Ada L.", "ada@example.com").await.unwrap();
        assert_eq!(renamed.display_name(), "Ada L.");
        assert_eq!(renamed.created_at(), created.created_at());
        assert_eq!(service.get(user).await.unwrap(), Some(renamed));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        service
            .register(UserId::random(), "Ada", "ada@example.com")
            .await
            .unwrap();
        let err = service
            .register(UserId::random(), "Imposter", "ADA@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminServiceError::EmailTaken(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = service()
            .register(UserId::random(), "  ", "ada@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
