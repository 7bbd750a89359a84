//! Owns the signed-in user's completed-set and keeps it in step with the
//! progress store.
//!
//! Toggles are optimistic: the local set flips before the remote write and
//! is put back if that write fails. A toggle runs in two phases
//! (`begin_toggle` then `confirm_toggle` or `revert_toggle`) and holds a
//! per-topic lock across both, so overlapping toggles of one topic queue up
//! while different topics proceed independently.
//!
//! Every settled toggle bumps a generation counter. A `load` whose fetch
//! started before a toggle settled re-applies that toggle on top of the
//! fetched marks instead of rolling it back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storage::cache::ProgressCache;
use storage::changes::ChangeNotice;
use storage::repository::{ProgressRepository, StorageError};
use study_core::model::{CompletedSet, ProgressMark, TopicId, UserId};
use tokio::sync::{OwnedMutexGuard, broadcast};

use crate::Clock;
use crate::error::SyncError;

type TopicLock = Arc<tokio::sync::Mutex<()>>;

/// Fetches retried when a toggle is abandoned mid-load.
const LOAD_ATTEMPTS: usize = 3;

#[derive(Debug, Default)]
struct SyncState {
    completed: CompletedSet,
    /// Optimistic membership of toggles whose remote write is still running.
    in_flight: HashMap<TopicId, bool>,
    /// Last settled membership per topic and the generation it settled at.
    settled: HashMap<TopicId, (u64, bool)>,
    generation: u64,
    /// Generation of the most recent abandoned toggle.
    abandoned_at: u64,
    loaded: bool,
}

impl SyncState {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SyncState>,
    topic_locks: Mutex<HashMap<TopicId, TopicLock>>,
}

// Critical sections never leave the state half-written, so a poisoned lock
// is recovered rather than reported.
impl Shared {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<TopicId, TopicLock>> {
        self.topic_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn topic_lock(&self, topic_id: TopicId) -> TopicLock {
        Arc::clone(self.locks().entry(topic_id).or_default())
    }

    fn prune_lock(&self, topic_id: TopicId) {
        let mut locks = self.locks();
        if locks
            .get(&topic_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&topic_id);
        }
    }
}

/// An applied-but-unconfirmed toggle.
///
/// Holds the topic's lock until passed to `confirm_toggle` or
/// `revert_toggle`. Dropping it unsettled (a cancelled `toggle`) keeps the
/// optimistic value on screen but stops shielding it from the next `load`,
/// which then takes whatever the store holds.
#[derive(Debug)]
pub struct PendingToggle {
    topic_id: TopicId,
    was_complete: bool,
    settled: bool,
    permit: Option<OwnedMutexGuard<()>>,
    shared: Arc<Shared>,
}

impl PendingToggle {
    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn was_complete(&self) -> bool {
        self.was_complete
    }

    /// Membership the toggle is trying to persist.
    #[must_use]
    pub fn target(&self) -> bool {
        !self.was_complete
    }
}

impl Drop for PendingToggle {
    fn drop(&mut self) {
        if !self.settled {
            let mut state = self.shared.state();
            state.in_flight.remove(&self.topic_id);
            state.settled.remove(&self.topic_id);
            let generation = state.bump();
            state.abandoned_at = generation;
            tracing::debug!(topic_id = %self.topic_id, "toggle abandoned");
        }
        drop(self.permit.take());
        self.shared.prune_lock(self.topic_id);
    }
}

/// Result of a persisted toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub topic_id: TopicId,
    pub complete: bool,
}

pub struct ProgressSynchronizer {
    user_id: UserId,
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    cache: Option<Arc<dyn ProgressCache>>,
    shared: Arc<Shared>,
    hint_turn: tokio::sync::Mutex<()>,
}

impl ProgressSynchronizer {
    #[must_use]
    pub fn new(user_id: UserId, clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            user_id,
            clock,
            progress,
            cache: None,
            shared: Arc::new(Shared::default()),
            hint_turn: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ProgressCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Copy of the current local set, including optimistic changes.
    #[must_use]
    pub fn completed(&self) -> CompletedSet {
        self.shared.state().completed.clone()
    }

    #[must_use]
    pub fn is_complete(&self, topic_id: TopicId) -> bool {
        self.shared.state().completed.contains(topic_id)
    }

    /// Whether a `load` has succeeded at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.shared.state().loaded
    }

    /// Seed the local set from the cache hint.
    ///
    /// Returns `true` when a hint was applied. Hints never override a set
    /// that already came from the store, and cache failures only log.
    pub async fn hydrate_from_cache(&self) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        let hint = match cache.load_hint(self.user_id).await {
            Ok(Some(hint)) => hint,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(user_id = %self.user_id, error = %err, "progress cache unreadable");
                return false;
            }
        };

        let mut state = self.shared.state();
        if state.loaded {
            return false;
        }
        tracing::debug!(user_id = %self.user_id, topics = hint.len(), "hydrated progress from cache");
        state.completed = hint;
        true
    }

    /// Replace the local set with the store's marks for this user.
    ///
    /// Toggles that settled while the fetch was running, and toggles still
    /// in flight, keep their value on top of the fetched set. A toggle
    /// abandoned mid-fetch makes the fetch start over. On failure the local
    /// set is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the marks cannot be fetched.
    pub async fn load(&self) -> Result<CompletedSet, SyncError> {
        tracing::debug!(user_id = %self.user_id, "loading progress");
        let mut attempt = 1;
        let snapshot = loop {
            let started = self.shared.state().generation;
            let fetched = self.progress.list_marks(self.user_id).await.map_err(|err| {
                tracing::warn!(user_id = %self.user_id, error = %err, "progress load failed");
                SyncError::from(err)
            })?;

            let mut state = self.shared.state();
            if state.abandoned_at > started && attempt < LOAD_ATTEMPTS {
                attempt += 1;
                continue;
            }
            let mut completed = fetched;
            for (&topic_id, &(generation, complete)) in &state.settled {
                if generation > started {
                    completed.set(topic_id, complete);
                }
            }
            for (&topic_id, &target) in &state.in_flight {
                completed.set(topic_id, target);
            }
            state.completed = completed;
            state.loaded = true;
            break state.completed.clone();
        };
        tracing::info!(user_id = %self.user_id, completed = snapshot.len(), "progress loaded");
        self.store_hint().await;
        Ok(snapshot)
    }

    /// Apply a toggle locally and return the pending write.
    ///
    /// Waits while another toggle of the same topic is pending.
    pub async fn begin_toggle(&self, topic_id: TopicId) -> PendingToggle {
        let lock = self.shared.topic_lock(topic_id);
        let permit = lock.lock_owned().await;

        let was_complete = {
            let mut state = self.shared.state();
            let was_complete = state.completed.toggle(topic_id);
            state.in_flight.insert(topic_id, !was_complete);
            was_complete
        };
        tracing::debug!(
            user_id = %self.user_id,
            %topic_id,
            complete = !was_complete,
            "optimistic toggle applied"
        );
        PendingToggle {
            topic_id,
            was_complete,
            settled: false,
            permit: Some(permit),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Keep the optimistic value and release the topic.
    pub async fn confirm_toggle(&self, mut pending: PendingToggle) -> ToggleOutcome {
        let outcome = ToggleOutcome {
            topic_id: pending.topic_id,
            complete: pending.target(),
        };
        self.settle(&mut pending, outcome.complete);
        drop(pending);
        self.store_hint().await;
        outcome
    }

    /// Restore the topic's pre-toggle membership and release the topic.
    pub fn revert_toggle(&self, mut pending: PendingToggle) {
        let previous = pending.was_complete;
        self.settle(&mut pending, previous);
        tracing::warn!(
            user_id = %self.user_id,
            topic_id = %pending.topic_id,
            complete = previous,
            "toggle rolled back"
        );
    }

    /// Flip a topic and persist the change.
    ///
    /// Inserts a mark when the topic was open and deletes it when it was
    /// done. A failed write puts the local set back the way it was.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the remote write fails.
    pub async fn toggle(&self, topic_id: TopicId) -> Result<ToggleOutcome, SyncError> {
        let pending = self.begin_toggle(topic_id).await;
        match self.persist(&pending).await {
            Ok(()) => Ok(self.confirm_toggle(pending).await),
            Err(err) => {
                self.revert_toggle(pending);
                Err(err.into())
            }
        }
    }

    /// Reload whenever a notice concerns this user, until the feed closes.
    pub async fn follow_changes(&self, mut notices: broadcast::Receiver<ChangeNotice>) {
        loop {
            let reload = match notices.recv().await {
                Ok(notice) => notice.affects(self.user_id),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change feed lagged");
                    true
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if reload {
                // Failures are logged by `load`; the next notice retries.
                let _ = self.load().await;
            }
        }
        tracing::debug!(user_id = %self.user_id, "change feed closed");
    }

    fn settle(&self, pending: &mut PendingToggle, complete: bool) {
        let mut state = self.shared.state();
        state.in_flight.remove(&pending.topic_id);
        state.completed.set(pending.topic_id, complete);
        let generation = state.bump();
        state.settled.insert(pending.topic_id, (generation, complete));
        pending.settled = true;
    }

    async fn persist(&self, pending: &PendingToggle) -> Result<(), StorageError> {
        if pending.was_complete {
            tracing::debug!(user_id = %self.user_id, topic_id = %pending.topic_id, "deleting mark");
            self.progress
                .delete_mark(self.user_id, pending.topic_id)
                .await
        } else {
            tracing::debug!(user_id = %self.user_id, topic_id = %pending.topic_id, "inserting mark");
            let mark = ProgressMark::new(self.user_id, pending.topic_id, self.clock.now());
            self.progress.insert_mark(&mark).await
        }
    }

    /// Write the current set to the cache. Writers take turns and each one
    /// snapshots only once its turn comes, so the last write is the newest.
    async fn store_hint(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let _turn = self.hint_turn.lock().await;
        let snapshot = self.completed();
        if let Err(err) = cache.store_hint(self.user_id, &snapshot).await {
            tracing::warn!(user_id = %self.user_id, error = %err, "progress cache write failed");
        }
    }
}
