//! Client-side cache of the last-known completed-set per user.
//!
//! Cached sets are hints for a fast first paint; the next successful load
//! from the progress store always overwrites them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use study_core::model::{CompletedSet, UserId};
use tokio::fs;

use crate::repository::StorageError;

#[async_trait]
pub trait ProgressCache: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read or decoded.
    async fn load_hint(&self, user_id: UserId) -> Result<Option<CompletedSet>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn store_hint(&self, user_id: UserId, set: &CompletedSet) -> Result<(), StorageError>;
}

#[derive(Clone, Default)]
pub struct InMemoryProgressCache {
    entries: Arc<Mutex<HashMap<UserId, CompletedSet>>>,
}

impl InMemoryProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, CompletedSet>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProgressCache for InMemoryProgressCache {
    async fn load_hint(&self, user_id: UserId) -> Result<Option<CompletedSet>, StorageError> {
        Ok(self.entries().get(&user_id).cloned())
    }

    async fn store_hint(&self, user_id: UserId, set: &CompletedSet) -> Result<(), StorageError> {
        self.entries().insert(user_id, set.clone());
        Ok(())
    }
}

/// Stores every user's hint in one JSON object: `{ "<user id>": ["<topic id>", ...] }`.
pub struct JsonFileProgressCache {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileProgressCache {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<UserId, CompletedSet>, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StorageError::Connection(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ProgressCache for JsonFileProgressCache {
    async fn load_hint(&self, user_id: UserId) -> Result<Option<CompletedSet>, StorageError> {
        let mut all = self.read_all().await?;
        Ok(all.remove(&user_id))
    }

    async fn store_hint(&self, user_id: UserId, set: &CompletedSet) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        // A corrupt cache is replaced rather than blocking new hints.
        let mut all = match self.read_all().await {
            Ok(all) => all,
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(path = %self.path.display(), %reason, "discarding unreadable progress cache");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        all.insert(user_id, set.clone());

        let bytes =
            serde_json::to_vec_pretty(&all).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        tracing::debug!(%user_id, topics = set.len(), "stored progress hint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::TopicId;

    #[tokio::test]
    async fn missing_file_has_no_hint() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileProgressCache::new(dir.path().join("progress.json"));
        assert!(cache.load_hint(UserId::random()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hints_are_kept_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileProgressCache::new(dir.path().join("nested").join("progress.json"));
        let alice = UserId::random();
        let bob = UserId::random();
        let alice_set: CompletedSet = [TopicId::random(), TopicId::random()].into_iter().collect();
        let bob_set: CompletedSet = [TopicId::random()].into_iter().collect();

        cache.store_hint(alice, &alice_set).await.unwrap();
        cache.store_hint(bob, &bob_set).await.unwrap();

        let reopened = JsonFileProgressCache::new(cache.path());
        assert_eq!(reopened.load_hint(alice).await.unwrap(), Some(alice_set));
        assert_eq!(reopened.load_hint(bob).await.unwrap(), Some(bob_set));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_then_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, b"not json").unwrap();
        let cache = JsonFileProgressCache::new(&path);
        let user = UserId::random();

        assert!(matches!(
            cache.load_hint(user).await.unwrap_err(),
            StorageError::Serialization(_)
        ));

        let set: CompletedSet = [TopicId::random()].into_iter().collect();
        cache.store_hint(user, &set).await.unwrap();
        assert_eq!(cache.load_hint(user).await.unwrap(), Some(set));
    }

    #[tokio::test]
    async fn in_memory_cache_overwrites() {
        let cache = InMemoryProgressCache::new();
        let user = UserId::random();
        cache.store_hint(user, &CompletedSet::new()).await.unwrap();
        let set: CompletedSet = [TopicId::random()].into_iter().collect();
        cache.store_hint(user, &set).await.unwrap();
        assert_eq!(cache.load_hint(user).await.unwrap(), Some(set));
    }
}
