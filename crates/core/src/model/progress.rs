use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{TopicId, UserId};

/// A persisted completion mark. Existence of the row means "complete".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMark {
    pub user_id: UserId,
    pub topic_id: TopicId,
    pub completed_at: DateTime<Utc>,
}

impl ProgressMark {
    #[must_use]
    pub fn new(user_id: UserId, topic_id: TopicId, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            topic_id,
            completed_at,
        }
    }
}

/// The set of topic ids a user has marked done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedSet(HashSet<TopicId>);

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, topic_id: TopicId) -> bool {
        self.0.contains(&topic_id)
    }

    /// Sets membership for a topic and returns the previous membership.
    pub fn set(&mut self, topic_id: TopicId, complete: bool) -> bool {
        if complete {
            !self.0.insert(topic_id)
        } else {
            self.0.remove(&topic_id)
        }
    }

    /// Flips membership and returns the previous membership.
    pub fn toggle(&mut self, topic_id: TopicId) -> bool {
        let was_complete = self.contains(topic_id);
        self.set(topic_id, !was_complete);
        was_complete
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.0.iter().copied()
    }

    /// Topic ids in a stable order, for persistence and logging.
    #[must_use]
    pub fn sorted(&self) -> Vec<TopicId> {
        let mut ids: Vec<TopicId> = self.0.iter().copied().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<TopicId> for CompletedSet {
    fn from_iter<I: IntoIterator<Item = TopicId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<TopicId> for CompletedSet {
    fn extend<I: IntoIterator<Item = TopicId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
