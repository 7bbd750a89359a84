use study_core::model::UserId;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// A write that other sessions may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeNotice {
    /// A section or topic was added.
    Catalog,
    /// A mark was inserted or deleted for this user.
    Progress { user_id: UserId },
    /// A profile or role changed.
    Users,
}

impl ChangeNotice {
    /// Whether a session owned by `user_id` has to reload its progress.
    #[must_use]
    pub fn affects(&self, user_id: UserId) -> bool {
        match self {
            Self::Catalog => true,
            Self::Progress { user_id: changed } => *changed == user_id,
            Self::Users => false,
        }
    }
}

/// Broadcasts change notices from repositories to subscribed sessions.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeNotice>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.sender.subscribe()
    }

    /// Publish a notice. Having no subscribers is not an error.
    pub fn publish(&self, notice: ChangeNotice) {
        match self.sender.send(notice) {
            Ok(receivers) => tracing::debug!(?notice, receivers, "published change"),
            Err(_) => tracing::trace!(?notice, "no change subscribers"),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_notices_only_affect_their_user() {
        let me = UserId::random();
        let other = UserId::random();
        assert!(ChangeNotice::Progress { user_id: me }.affects(me));
        assert!(!ChangeNotice::Progress { user_id: other }.affects(me));
        assert!(ChangeNotice::Catalog.affects(me));
        assert!(!ChangeNotice::Users.affects(me));
    }

    #[tokio::test]
    async fn subscribers_receive_published_notices() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();
        feed.publish(ChangeNotice::Catalog);
        assert_eq!(rx.recv().await.unwrap(), ChangeNotice::Catalog);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        ChangeFeed::new().publish(ChangeNotice::Users);
    }
}
