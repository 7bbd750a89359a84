use std::sync::Arc;

use async_trait::async_trait;
use study_core::model::{CurrentUser, UserId};

use crate::repository::{RoleRepository, StorageError};

/// Source of the signed-in user for a session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the role lookup fails.
    async fn current_user(&self) -> Result<Option<CurrentUser>, StorageError>;
}

/// Identity resolved from an already-authenticated user id plus the role table.
#[derive(Clone)]
pub struct SessionIdentity {
    user_id: Option<UserId>,
    roles: Arc<dyn RoleRepository>,
}

impl SessionIdentity {
    #[must_use]
    pub fn signed_in(user_id: UserId, roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            user_id: Some(user_id),
            roles,
        }
    }

    #[must_use]
    pub fn anonymous(roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            user_id: None,
            roles,
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_user(&self) -> Result<Option<CurrentUser>, StorageError> {
        let Some(id) = self.user_id else {
            return Ok(None);
        };
        let is_admin = self.roles.is_admin(id).await?;
        Ok(Some(CurrentUser { id, is_admin }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, ProfileRepository};
    use study_core::model::{Email, Profile};
    use study_core::time::fixed_now;

    #[tokio::test]
    async fn resolves_admin_flag_from_roles() {
        let repo = InMemoryRepository::new();
        let profile = Profile::new(
            UserId::random(),
            "Ada",
            Email::parse("ada@example.com").unwrap(),
            fixed_now(),
        )
        .unwrap();
        repo.upsert_profile(&profile).await.unwrap();
        let roles: Arc<dyn RoleRepository> = Arc::new(repo.clone());

        let identity = SessionIdentity::signed_in(profile.user_id(), Arc::clone(&roles));
        assert_eq!(
            identity.current_user().await.unwrap(),
            Some(CurrentUser::member(profile.user_id()))
        );

        repo.grant_admin(profile.user_id()).await.unwrap();
        assert_eq!(
            identity.current_user().await.unwrap(),
            Some(CurrentUser::admin(profile.user_id()))
        );
    }

    #[tokio::test]
    async fn anonymous_has_no_user() {
        let roles: Arc<dyn RoleRepository> = Arc::new(InMemoryRepository::new());
        assert!(SessionIdentity::anonymous(roles).current_user().await.unwrap().is_none());
    }
}
