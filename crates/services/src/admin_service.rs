use std::sync::Arc;

use storage::repository::{ProfileRepository, RoleRepository, StorageError};
use study_core::model::{CurrentUser, Email, Profile, UserId};

use crate::error::AdminServiceError;

/// Result of granting the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantOutcome {
    pub user_id: UserId,
    /// `false` when the user was already an admin.
    pub newly_granted: bool,
}

/// Admin-only user management.
#[derive(Clone)]
pub struct AdminService {
    profiles: Arc<dyn ProfileRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { profiles, roles }
    }

    /// Every registered user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::PermissionDenied` for non-admins.
    /// Returns `AdminServiceError::Storage` if profiles cannot be read.
    pub async fn list_users(&self, actor: &CurrentUser) -> Result<Vec<Profile>, AdminServiceError> {
        ensure_admin(actor)?;
        Ok(self.profiles.list_profiles().await?)
    }

    /// Promote the user registered under `email`. Granting twice is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::PermissionDenied` for non-admins.
    /// Returns `AdminServiceError::Profile` for a malformed email.
    /// Returns `AdminServiceError::UnknownEmail` if nobody has that email.
    /// Returns `AdminServiceError::Storage` if the role cannot be written.
    pub async fn grant_admin(
        &self,
        actor: &CurrentUser,
        email: &str,
    ) -> Result<GrantOutcome, AdminServiceError> {
        ensure_admin(actor)?;
        let email = Email::parse(email)?;
        let profile = self
            .profiles
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AdminServiceError::UnknownEmail(email.as_str().to_owned()))?;

        let newly_granted = self
            .roles
            .grant_admin(profile.user_id())
            .await
            .map_err(|err| match err {
                StorageError::NotFound => AdminServiceError::UnknownEmail(email.as_str().to_owned()),
                other => AdminServiceError::Storage(other),
            })?;
        tracing::info!(
            actor = %actor.id,
            user_id = %profile.user_id(),
            newly_granted,
            "admin role granted"
        );
        Ok(GrantOutcome {
            user_id: profile.user_id(),
            newly_granted,
        })
    }
}

fn ensure_admin(actor: &CurrentUser) -> Result<(), AdminServiceError> {
    if actor.is_admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.id, "admin action refused");
        Err(AdminServiceError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use storage::repository::InMemoryRepository;
    use study_core::ErrorKind;
    use study_core::time::fixed_now;

    use super::*;

    async fn setup() -> (AdminService, InMemoryRepository, Profile, Profile) {
        let repo = InMemoryRepository::new();
        let older = Profile::new(
            UserId::random(),
            "Older",
            Email::parse("older@example.com").unwrap(),
            fixed_now(),
        )
        .unwrap();
        let newer = Profile::new(
            UserId::random(),
            "Newer",
            Email::parse("newer@example.com").unwrap(),
            fixed_now() + chrono::Duration::hours(1),
        )
        .unwrap();
        repo.upsert_profile(&older).await.unwrap();
        repo.upsert_profile(&newer).await.unwrap();
        let service = AdminService::new(Arc::new(repo.clone()), Arc::new(repo.clone()));
        (service, repo, older, newer)
    }

    #[tokio::test]
    async fn lists_newest_first_for_admins_only() {
        let (service, _, older, newer) = setup().await;
        let admin = CurrentUser::admin(older.user_id());
        let users = service.list_users(&admin).await.unwrap();
        assert_eq!(users, vec![newer.clone(), older]);

        let member = CurrentUser::member(newer.user_id());
        let err = service.list_users(&member).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[tokio::test]
    async fn grants_by_email_once() {
        let (service, repo, older, newer) = setup().await;
        let admin = CurrentUser::admin(older.user_id());

        let first = service.grant_admin(&admin, " Newer@Example.com ").await.unwrap();
        assert_eq!(first.user_id, newer.user_id());
        assert!(first.newly_granted);
        assert!(repo.is_admin(newer.user_id()).await.unwrap());

        let again = service.grant_admin(&admin, "newer@example.com").await.unwrap();
        assert!(!again.newly_granted);
    }

    #[tokio::test]
    async fn unknown_or_malformed_email() {
        let (service, _, older, _) = setup().await;
        let admin = CurrentUser::admin(older.user_id());

        let missing = service.grant_admin(&admin, "ghost@example.com").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let malformed = service.grant_admin(&admin, "not-an-email").await.unwrap_err();
        assert_eq!(malformed.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn members_cannot_grant() {
        let (service, repo, older, newer) = setup().await;
        let member = CurrentUser::member(older.user_id());
        let err = service.grant_admin(&member, "newer@example.com").await.unwrap_err();
        assert!(matches!(err, AdminServiceError::PermissionDenied));
        assert!(!repo.is_admin(newer.user_id()).await.unwrap());
    }
}
