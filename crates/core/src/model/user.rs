use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,

    #[error("invalid email address")]
    InvalidEmail,
}

/// The authenticated user of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl CurrentUser {
    #[must_use]
    pub fn member(id: UserId) -> Self {
        Self {
            id,
            is_admin: false,
        }
    }

    #[must_use]
    pub fn admin(id: UserId) -> Self {
        Self { id, is_admin: true }
    }
}

/// Lower-cased email address with a minimal shape check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidEmail` unless the input has a non-empty
    /// local part and a dotted domain.
    pub fn parse(value: impl Into<String>) -> Result<Self, ProfileError> {
        let raw = value.into();
        let normalized = raw.trim().to_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(ProfileError::InvalidEmail);
        };
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(ProfileError::InvalidEmail);
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Public profile shown on the leaderboard and in the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    user_id: UserId,
    display_name: String,
    email: Email,
    created_at: DateTime<Utc>,
}

impl Profile {
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyDisplayName` for a blank display name.
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        email: Email,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        let display_name = display_name.into();
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        Ok(Self {
            user_id,
            display_name: trimmed.to_owned(),
            email,
            created_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
