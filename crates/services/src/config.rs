//! Environment-driven configuration for the tracker services.

use std::path::PathBuf;

use storage::sqlite::normalize_sqlite_url;

use crate::error::ConfigError;

pub const DB_URL_VAR: &str = "TRACKER_DB_URL";
pub const LEADERBOARD_LIMIT_VAR: &str = "TRACKER_LEADERBOARD_LIMIT";
pub const CACHE_PATH_VAR: &str = "TRACKER_CACHE_PATH";

pub const DEFAULT_DB_URL: &str = "sqlite://tracker.sqlite3";
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub db_url: String,
    pub leaderboard_limit: u32,
    pub cache_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_url: normalize_sqlite_url(DEFAULT_DB_URL),
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            cache_path: None,
        }
    }
}

impl TrackerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = match lookup(DB_URL_VAR) {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::Empty { name: DB_URL_VAR });
            }
            Some(raw) => normalize_sqlite_url(raw.trim()),
            None => normalize_sqlite_url(DEFAULT_DB_URL),
        };

        let leaderboard_limit = match lookup(LEADERBOARD_LIMIT_VAR) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: LEADERBOARD_LIMIT_VAR,
                        raw,
                    });
                }
            },
            None => DEFAULT_LEADERBOARD_LIMIT,
        };

        let cache_path = lookup(CACHE_PATH_VAR)
            .map(|raw| raw.trim().to_owned())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            db_url,
            leaderboard_limit,
            cache_path,
        })
    }
}
