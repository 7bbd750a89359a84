mod catalog;
mod ids;
mod leaderboard;
mod progress;
mod section;
mod topic;
mod user;

pub use catalog::Catalog;
pub use ids::{ParseIdError, SectionId, TopicId, UserId};
pub use leaderboard::{LeaderboardEntry, Placement, RankedEntry, assign_placements};
pub use progress::{CompletedSet, ProgressMark};
pub use section::{Section, SectionError};
pub use topic::{MAX_TOPIC_CHARS, NewTopic, Topic, TopicError, TopicText};
pub use user::{CurrentUser, Email, Profile, ProfileError};
