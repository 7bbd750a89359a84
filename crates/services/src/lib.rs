#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod leaderboard_service;
pub mod profile_service;
pub mod progress_sync;
pub mod tracker_view;

pub use study_core::Clock;

pub use admin_service::{AdminService, GrantOutcome};
pub use app_services::{TrackerServices, TrackerSession};
pub use catalog_service::CatalogService;
pub use config::TrackerConfig;
pub use error::{
    AdminServiceError, AppServicesError, CatalogServiceError, ConfigError, LeaderboardError,
    SessionError, SyncError,
};
pub use leaderboard_service::{LeaderboardService, LeaderboardSnapshot};
pub use profile_service::ProfileService;
pub use progress_sync::{PendingToggle, ProgressSynchronizer, ToggleOutcome};
pub use tracker_view::{SectionView, TopicView, TrackerView};
