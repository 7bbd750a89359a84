use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use study_core::model::{
    CompletedSet, Email, LeaderboardEntry, NewTopic, Profile, ProgressMark, Section, SectionId,
    Topic, TopicId, UserId,
};
use thiserror::Error;

use crate::changes::{ChangeFeed, ChangeNotice};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Curriculum sections and topics.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Sections ordered by display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_sections(&self) -> Result<Vec<Section>, StorageError>;

    /// Topics ordered by section order, then topic display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError>;

    /// Insert or replace a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the section cannot be stored.
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError>;

    /// Append a topic at the end of its section.
    ///
    /// The display order is `max(existing) + 1`, assigned atomically by the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the section does not exist.
    async fn append_topic(&self, id: TopicId, topic: &NewTopic) -> Result<Topic, StorageError>;
}

/// Per-user completion marks.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_marks(&self, user_id: UserId) -> Result<CompletedSet, StorageError>;

    /// Insert a mark. Inserting an existing mark is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn insert_mark(&self, mark: &ProgressMark) -> Result<(), StorageError>;

    /// Delete a mark. Deleting a missing mark is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn delete_mark(&self, user_id: UserId, topic_id: TopicId) -> Result<(), StorageError>;
}

/// Read-only ranking view.
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Up to `limit` entries, sorted by completion percentage descending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email belongs to another user.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, StorageError>;

    /// All profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError>;

    /// Grant the admin role. Returns `false` if the user already had it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user has no profile.
    async fn grant_admin(&self, user_id: UserId) -> Result<bool, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    sections: HashMap<SectionId, Section>,
    topics: HashMap<TopicId, Topic>,
    marks: HashMap<UserId, CompletedSet>,
    profiles: HashMap<UserId, Profile>,
    admins: HashSet<UserId>,
}

impl MemoryState {
    fn ordered_topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.topics.values().cloned().collect();
        topics.sort_by_key(|t| {
            let section_order = self
                .sections
                .get(&t.section_id())
                .map_or(i64::MAX, Section::order);
            (section_order, t.order(), t.id())
        });
        topics
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    changes: ChangeFeed,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_changes(ChangeFeed::new())
    }

    #[must_use]
    pub fn with_changes(changes: ChangeFeed) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            changes,
        }
    }

    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    // Critical sections never leave the state half-written, so a poisoned
    // lock is recovered rather than reported.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_sections(&self) -> Result<Vec<Section>, StorageError> {
        let guard = self.lock();
        let mut sections: Vec<Section> = guard.sections.values().cloned().collect();
        sections.sort_by_key(|s| (s.order(), s.id()));
        Ok(sections)
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        Ok(self.lock().ordered_topics())
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        self.lock().sections.insert(section.id(), section.clone());
        self.changes.publish(ChangeNotice::Catalog);
        Ok(())
    }

    async fn append_topic(&self, id: TopicId, topic: &NewTopic) -> Result<Topic, StorageError> {
        let created = {
            let mut guard = self.lock();
            if !guard.sections.contains_key(&topic.section_id()) {
                return Err(StorageError::NotFound);
            }
            if guard.topics.contains_key(&id) {
                return Err(StorageError::Conflict);
            }
            let next_order = guard
                .topics
                .values()
                .filter(|t| t.section_id() == topic.section_id())
                .map(Topic::order)
                .max()
                .unwrap_or(0)
                + 1;
            let created = Topic::new(id, topic.section_id(), topic.text().clone(), next_order);
            guard.topics.insert(id, created.clone());
            created
        };
        self.changes.publish(ChangeNotice::Catalog);
        Ok(created)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list_marks(&self, user_id: UserId) -> Result<CompletedSet, StorageError> {
        let guard = self.lock();
        Ok(guard.marks.get(&user_id).cloned().unwrap_or_default())
    }

    async fn insert_mark(&self, mark: &ProgressMark) -> Result<(), StorageError> {
        {
            let mut guard = self.lock();
            if !guard.topics.contains_key(&mark.topic_id) {
                return Err(StorageError::NotFound);
            }
            guard
                .marks
                .entry(mark.user_id)
                .or_default()
                .set(mark.topic_id, true);
        }
        self.changes.publish(ChangeNotice::Progress {
            user_id: mark.user_id,
        });
        Ok(())
    }

    async fn delete_mark(&self, user_id: UserId, topic_id: TopicId) -> Result<(), StorageError> {
        {
            let mut guard = self.lock();
            if let Some(set) = guard.marks.get_mut(&user_id) {
                set.set(topic_id, false);
            }
        }
        self.changes.publish(ChangeNotice::Progress { user_id });
        Ok(())
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryRepository {
    async fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let guard = self.lock();
        let total = u32::try_from(guard.topics.len()).unwrap_or(u32::MAX);

        let mut profiles: Vec<&Profile> = guard.profiles.values().collect();
        profiles.sort_by_key(|p| (p.created_at(), p.user_id()));

        let mut entries: Vec<LeaderboardEntry> = profiles
            .into_iter()
            .map(|profile| {
                let completed = guard.marks.get(&profile.user_id()).map_or(0, |set| {
                    set.iter().filter(|id| guard.topics.contains_key(id)).count()
                });
                LeaderboardEntry::from_counts(
                    profile.user_id(),
                    profile.display_name(),
                    u32::try_from(completed).unwrap_or(u32::MAX),
                    total,
                )
            })
            .collect();

        // Stable sort: equal percentages keep sign-up order.
        entries.sort_by(|a, b| {
            b.completion_percentage
                .value()
                .total_cmp(&a.completion_percentage.value())
                .then(b.completed_count.cmp(&a.completed_count))
        });
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        {
            let mut guard = self.lock();
            let taken = guard
                .profiles
                .values()
                .any(|p| p.email() == profile.email() && p.user_id() != profile.user_id());
            if taken {
                return Err(StorageError::Conflict);
            }
            guard.profiles.insert(profile.user_id(), profile.clone());
        }
        self.changes.publish(ChangeNotice::Users);
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        Ok(self.lock().profiles.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, StorageError> {
        let guard = self.lock();
        Ok(guard.profiles.values().find(|p| p.email() == email).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let guard = self.lock();
        let mut profiles: Vec<Profile> = guard.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(profiles)
    }
}

#[async_trait]
impl RoleRepository for InMemoryRepository {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        Ok(self.lock().admins.contains(&user_id))
    }

    async fn grant_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        let granted = {
            let mut guard = self.lock();
            if !guard.profiles.contains_key(&user_id) {
                return Err(StorageError::NotFound);
            }
            guard.admins.insert(user_id)
        };
        if granted {
            self.changes.publish(ChangeNotice::Users);
        }
        Ok(granted)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub leaderboard: Arc<dyn LeaderboardRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub changes: ChangeFeed,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            changes: repo.changes().clone(),
            catalog: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            leaderboard: Arc::new(repo.clone()),
            profiles: Arc::new(repo.clone()),
            roles: Arc::new(repo),
        }
    }
}
