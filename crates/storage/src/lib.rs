#![forbid(unsafe_code)]

pub mod cache;
pub mod changes;
pub mod curriculum;
pub mod identity;
pub mod repository;
pub mod sqlite;

pub use cache::{InMemoryProgressCache, JsonFileProgressCache, ProgressCache};
pub use changes::{ChangeFeed, ChangeNotice};
pub use identity::{IdentityProvider, SessionIdentity};
pub use repository::{InMemoryRepository, Storage, StorageError};
