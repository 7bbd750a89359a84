use crate::model::ids::{SectionId, TopicId};
use crate::model::{Section, Topic};

/// Sections and topics, each kept in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    sections: Vec<Section>,
    topics: Vec<Topic>,
}

impl Catalog {
    /// Build a catalog, sorting sections by order and topics by (section order, order).
    ///
    /// Topics whose section is unknown sort last and are kept so that overall
    /// counts still match the store.
    #[must_use]
    pub fn new(mut sections: Vec<Section>, mut topics: Vec<Topic>) -> Self {
        sections.sort_by_key(Section::order);
        let section_rank = |id: SectionId| {
            sections
                .iter()
                .position(|s| s.id() == id)
                .unwrap_or(usize::MAX)
        };
        topics.sort_by_key(|t| (section_rank(t.section_id()), t.order()));
        Self { sections, topics }
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id)
    }

    #[must_use]
    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id() == id)
    }

    pub fn topics_in(&self, section_id: SectionId) -> impl Iterator<Item = &Topic> {
        self.topics
            .iter()
            .filter(move |t| t.section_id() == section_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicText;

    #[test]
    fn orders_sections_and_topics() {
        let s1 = Section::new(SectionId::random(), "First", "📘", 1).unwrap();
        let s2 = Section::new(SectionId::random(), "Second", "📗", 2).unwrap();
        let text = |s: &str| TopicText::parse(s).unwrap();
        let a = Topic::new(TopicId::random(), s2.id(), text("a"), 1);
        let b = Topic::new(TopicId::random(), s1.id(), text("b"), 2);
        let c = Topic::new(TopicId::random(), s1.id(), text("c"), 1);

        let catalog = Catalog::new(vec![s2.clone(), s1.clone()], vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(catalog.sections(), &[s1.clone(), s2.clone()]);
        assert_eq!(catalog.topics(), &[c.clone(), b.clone(), a.clone()]);
        assert_eq!(catalog.topics_in(s1.id()).count(), 2);
        assert_eq!(catalog.topic(a.id()), Some(&a));
        assert!(catalog.section(SectionId::random()).is_none());
    }
}
