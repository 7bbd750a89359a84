use std::sync::Arc;

use storage::cache::{JsonFileProgressCache, ProgressCache};
use storage::changes::ChangeFeed;
use storage::identity::IdentityProvider;
use storage::repository::Storage;
use study_core::model::{CurrentUser, Topic, TopicId};
use tokio::task::JoinHandle;

use crate::Clock;
use crate::admin_service::AdminService;
use crate::catalog_service::CatalogService;
use crate::config::TrackerConfig;
use crate::error::{AppServicesError, SessionError};
use crate::leaderboard_service::{LeaderboardService, LeaderboardSnapshot};
use crate::profile_service::ProfileService;
use crate::progress_sync::{ProgressSynchronizer, ToggleOutcome};
use crate::tracker_view::TrackerView;

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct TrackerServices {
    clock: Clock,
    storage: Storage,
    cache: Option<Arc<dyn ProgressCache>>,
    catalog: Arc<CatalogService>,
    leaderboard: Arc<LeaderboardService>,
    admin: Arc<AdminService>,
    profiles: Arc<ProfileService>,
}

impl TrackerServices {
    #[must_use]
    pub fn new(
        storage: Storage,
        clock: Clock,
        leaderboard_limit: u32,
        cache: Option<Arc<dyn ProgressCache>>,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));
        let leaderboard = Arc::new(LeaderboardService::new(
            Arc::clone(&storage.leaderboard),
            leaderboard_limit,
        ));
        let admin = Arc::new(AdminService::new(
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.roles),
        ));
        let profiles = Arc::new(ProfileService::new(clock, Arc::clone(&storage.profiles)));
        Self {
            clock,
            storage,
            cache,
            catalog,
            leaderboard,
            admin,
            profiles,
        }
    }

    /// Build services backed by `SQLite` as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the database cannot be opened
    /// or migrated.
    pub async fn from_config(config: &TrackerConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let cache = config
            .cache_path
            .as_ref()
            .map(|path| Arc::new(JsonFileProgressCache::new(path)) as Arc<dyn ProgressCache>);
        tracing::info!(
            db = %config.db_url,
            leaderboard_limit = config.leaderboard_limit,
            cache = cache.is_some(),
            "tracker services ready"
        );
        Ok(Self::new(storage, clock, config.leaderboard_limit, cache))
    }

    /// Read `TrackerConfig` from the environment and build `SQLite` services.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` for malformed variables, otherwise
    /// the same errors as `from_config`.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let config = TrackerConfig::from_env()?;
        Self::from_config(&config, clock).await
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(Storage::in_memory(), clock, crate::config::DEFAULT_LEADERBOARD_LIMIT, None)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.storage.changes
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    /// Start a session for whoever `identity` reports as signed in.
    ///
    /// The synchronizer is hydrated from the cache when one is configured,
    /// then loaded from the store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthenticated` if nobody is signed in.
    /// Returns `SessionError::Storage` if the identity lookup fails.
    /// Returns `SessionError::Sync` if the initial load fails.
    pub async fn start_session(
        &self,
        identity: &dyn IdentityProvider,
    ) -> Result<TrackerSession, SessionError> {
        let user = identity
            .current_user()
            .await?
            .ok_or(SessionError::Unauthenticated)?;

        let mut sync = ProgressSynchronizer::new(user.id, self.clock, Arc::clone(&self.storage.progress));
        if let Some(cache) = &self.cache {
            sync = sync.with_cache(Arc::clone(cache));
        }
        let sync = Arc::new(sync);
        sync.hydrate_from_cache().await;
        sync.load().await?;
        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "session started");

        Ok(TrackerSession {
            user,
            sync,
            catalog: Arc::clone(&self.catalog),
            leaderboard: Arc::clone(&self.leaderboard),
            changes: self.storage.changes.clone(),
            follower: None,
        })
    }
}

/// One signed-in user's view of the tracker.
pub struct TrackerSession {
    user: CurrentUser,
    sync: Arc<ProgressSynchronizer>,
    catalog: Arc<CatalogService>,
    leaderboard: Arc<LeaderboardService>,
    changes: ChangeFeed,
    follower: Option<JoinHandle<()>>,
}

impl TrackerSession {
    #[must_use]
    pub fn user(&self) -> CurrentUser {
        self.user
    }

    #[must_use]
    pub fn synchronizer(&self) -> Arc<ProgressSynchronizer> {
        Arc::clone(&self.sync)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Sync` if the remote write fails; the local set
    /// is already rolled back.
    pub async fn toggle(&self, topic_id: TopicId) -> Result<ToggleOutcome, SessionError> {
        Ok(self.sync.toggle(topic_id).await?)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Sync` if the marks cannot be fetched.
    pub async fn reload(&self) -> Result<(), SessionError> {
        self.sync.load().await?;
        Ok(())
    }

    /// Dashboard snapshot over the current catalog and local set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the catalog cannot be read.
    pub async fn view(&self) -> Result<TrackerView, SessionError> {
        let catalog = self.catalog.load_catalog().await?;
        Ok(TrackerView::build(&catalog, &self.sync.completed()))
    }

    pub async fn leaderboard(&self) -> LeaderboardSnapshot {
        self.leaderboard.top().await
    }

    /// # Errors
    ///
    /// See `CatalogService::append_topic`.
    pub async fn append_topic(&self, section_id: &str, text: &str) -> Result<Topic, SessionError> {
        Ok(self.catalog.append_topic(&self.user, section_id, text).await?)
    }

    /// Reload progress in the background whenever the change feed reports
    /// something relevant. Calling again is a no-op while the task runs.
    pub fn follow_changes(&mut self) {
        if self.follower.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let sync = Arc::clone(&self.sync);
        let notices = self.changes.subscribe();
        self.follower = Some(tokio::spawn(async move {
            sync.follow_changes(notices).await;
        }));
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.follower.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        if let Some(task) = self.follower.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use storage::identity::SessionIdentity;
    use storage::repository::StorageError;
    use study_core::ErrorKind;
    use study_core::time::fixed_clock;

    use super::*;

    struct Nobody;

    #[async_trait]
    impl IdentityProvider for Nobody {
        async fn current_user(&self) -> Result<Option<CurrentUser>, StorageError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn anonymous_session_is_refused() {
        let services = TrackerServices::in_memory(fixed_clock());
        let err = services.start_session(&Nobody).await.err().expect("refused");
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn member_session_cannot_append() {
        let services = TrackerServices::in_memory(fixed_clock());
        let profile = services
            .profiles()
            .register(study_core::model::UserId::random(), "Ada", "ada@example.com")
            .await
            .unwrap();
        let identity =
            SessionIdentity::signed_in(profile.user_id(), Arc::clone(&services.storage().roles));
        let session = services.start_session(&identity).await.unwrap();
        assert!(!session.user().is_admin);

        let err = session.append_topic("whatever", "text").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }
}
