use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SectionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("section title cannot be empty")]
    EmptyTitle,
}

/// A curriculum section grouping topics under a title.
///
/// Sections are created by administrators and are read-only for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    id: SectionId,
    title: String,
    emoji: String,
    order: i64,
}

impl Section {
    /// Creates a section with a trimmed, non-empty title.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::EmptyTitle` if the title is blank.
    pub fn new(
        id: SectionId,
        title: impl Into<String>,
        emoji: impl Into<String>,
        order: i64,
    ) -> Result<Self, SectionError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(SectionError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: trimmed.to_owned(),
            emoji: emoji.into(),
            order,
        })
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    /// Display order within the catalog (ascending).
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_title() {
        let section = Section::new(SectionId::random(), "  Until 25/08 ", "📘", 1).unwrap();
        assert_eq!(section.title(), "Until 25/08");
        assert_eq!(section.emoji(), "📘");
        assert_eq!(section.order(), 1);
    }

    #[test]
    fn rejects_blank_title() {
        let err = Section::new(SectionId::random(), "   ", "📘", 1).unwrap_err();
        assert_eq!(err, SectionError::EmptyTitle);
    }
}
