//! Shared error types for the services crate.
//!
//! Every enum maps onto `study_core::ErrorKind` so callers can decide how to
//! present a failure without matching on storage details.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::ErrorKind;
use study_core::model::{ProfileError, TopicError};

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Store,
    }
}

/// Errors emitted by `ProgressSynchronizer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("progress store failed: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("only admins can add topics")]
    PermissionDenied,
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error("section {0} does not exist")]
    SectionNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::Permission,
            Self::Topic(_) => ErrorKind::Validation,
            Self::SectionNotFound(_) => ErrorKind::NotFound,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error("leaderboard fetch failed: {0}")]
    Storage(#[from] StorageError),
}

impl LeaderboardError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `AdminService` and `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminServiceError {
    #[error("admin role required")]
    PermissionDenied,
    #[error("no user with email {0}")]
    UnknownEmail(String),
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AdminServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::Permission,
            Self::UnknownEmail(_) => ErrorKind::NotFound,
            Self::EmailTaken(_) | Self::Profile(_) => ErrorKind::Validation,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while starting or driving a tracker session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no user is signed in")]
    Unauthenticated,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Sync(err) => err.kind(),
            Self::Catalog(err) => err.kind(),
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while reading `TrackerConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
    #[error("{name} must be a positive integer, got {raw:?}")]
    InvalidNumber { name: &'static str, raw: String },
}

impl ConfigError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
