use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SectionId, TopicId};

/// Maximum topic text length, counted in characters.
pub const MAX_TOPIC_CHARS: usize = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic text cannot be empty")]
    EmptyText,

    #[error("topic text is too long ({len} > {MAX_TOPIC_CHARS} characters)")]
    TextTooLong { len: usize },

    #[error("invalid section selected")]
    InvalidSection,
}

//
// ─── TEXT ──────────────────────────────────────────────────────────────────────
//

/// Validated topic text: trimmed, 1..=500 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicText(String);

impl TopicText {
    /// Validate and normalize topic text.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyText` for blank input and
    /// `TopicError::TextTooLong` past `MAX_TOPIC_CHARS`.
    pub fn parse(value: impl Into<String>) -> Result<Self, TopicError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicError::EmptyText);
        }
        let len = trimmed.chars().count();
        if len > MAX_TOPIC_CHARS {
            return Err(TopicError::TextTooLong { len });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TopicText {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TopicText> for String {
    fn from(value: TopicText) -> Self {
        value.0
    }
}

impl std::fmt::Display for TopicText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A single checklist entry belonging to exactly one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    id: TopicId,
    section_id: SectionId,
    text: TopicText,
    order: i64,
}

impl Topic {
    #[must_use]
    pub fn new(id: TopicId, section_id: SectionId, text: TopicText, order: i64) -> Self {
        Self {
            id,
            section_id,
            text,
            order,
        }
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn text(&self) -> &TopicText {
        &self.text
    }

    /// Display order within its section (ascending).
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }
}

/// A validated request to append a topic to a section.
///
/// The display order is not part of the draft; stores assign it atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    section_id: SectionId,
    text: TopicText,
}

impl NewTopic {
    #[must_use]
    pub fn new(section_id: SectionId, text: TopicText) -> Self {
        Self { section_id, text }
    }

    /// Validate raw form input: a section id string and the topic text.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::InvalidSection` when the section id is missing or
    /// malformed, otherwise any text validation error.
    pub fn parse(section_id: &str, text: &str) -> Result<Self, TopicError> {
        let section_id = section_id
            .parse::<SectionId>()
            .map_err(|_| TopicError::InvalidSection)?;
        let text = TopicText::parse(text)?;
        Ok(Self { section_id, text })
    }

    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn text(&self) -> &TopicText {
        &self.text
    }
}
