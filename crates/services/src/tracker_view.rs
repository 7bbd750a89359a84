use serde::Serialize;

use study_core::model::{Catalog, CompletedSet, Section, Topic};
use study_core::{Progress, overall_progress, section_progress};

/// Presentation-agnostic dashboard snapshot.
///
/// Holds counts and percentages only; formatting is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerView {
    pub sections: Vec<SectionView>,
    pub overall: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub topics: Vec<TopicView>,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicView {
    pub topic: Topic,
    pub completed: bool,
}

impl TrackerView {
    /// Group the catalog by section in display order and attach progress.
    #[must_use]
    pub fn build(catalog: &Catalog, completed: &CompletedSet) -> Self {
        let sections = catalog
            .sections()
            .iter()
            .map(|section| SectionView {
                section: section.clone(),
                topics: catalog
                    .topics_in(section.id())
                    .map(|topic| TopicView {
                        topic: topic.clone(),
                        completed: completed.contains(topic.id()),
                    })
                    .collect(),
                progress: section_progress(section, catalog.topics(), completed),
            })
            .collect();
        Self {
            sections,
            overall: overall_progress(catalog.topics(), completed),
        }
    }

    /// Every topic is done (drives the completion message).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.overall.is_complete()
    }
}
