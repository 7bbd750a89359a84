//! Pure progress aggregation over a catalog and a completed-set.
//!
//! Results depend only on set membership and counts, never on topic order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{CompletedSet, Section, Topic};

/// Completion percentage clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Self = Self(0.0);
    pub const FULL: Self = Self(100.0);

    /// `completed / total × 100`, or zero when `total` is zero.
    #[must_use]
    pub fn from_counts(completed: u32, total: u32) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        Self::clamped(f64::from(completed) / f64::from(total) * 100.0)
    }

    /// Clamp an externally computed value; non-finite input maps to zero.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 100.0))
        } else {
            Self::ZERO
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Percentage {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl From<Percentage> for f64 {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Completed/total counts with the derived percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed_count: u32,
    pub total_count: u32,
    pub percentage: Percentage,
}

impl Progress {
    #[must_use]
    pub fn from_counts(completed_count: u32, total_count: u32) -> Self {
        Self {
            completed_count,
            total_count,
            percentage: Percentage::from_counts(completed_count, total_count),
        }
    }

    /// True when there is at least one topic and all of them are done.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.completed_count >= self.total_count
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total_count.saturating_sub(self.completed_count)
    }
}

fn count<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}

fn progress_over<'a, I>(topics: I, completed: &CompletedSet) -> Progress
where
    I: Iterator<Item = &'a Topic> + Clone,
{
    let total = count(topics.clone());
    let done = count(topics.filter(|topic| completed.contains(topic.id())));
    Progress::from_counts(done, total)
}

/// Progress of one section: only topics whose `section_id` matches count.
#[must_use]
pub fn section_progress(section: &Section, topics: &[Topic], completed: &CompletedSet) -> Progress {
    let id = section.id();
    progress_over(
        topics.iter().filter(move |topic| topic.section_id() == id),
        completed,
    )
}

/// Progress over the whole topic universe, ignoring section grouping.
///
/// Marks for topics outside `all_topics` are not counted.
#[must_use]
pub fn overall_progress(all_topics: &[Topic], completed: &CompletedSet) -> Progress {
    progress_over(all_topics.iter(), completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SectionId, TopicId, TopicText};

    fn section() -> Section {
        Section::new(SectionId::random(), "Section A", "📘", 1).unwrap()
    }

    fn topic(section: &Section, order: i64) -> Topic {
        Topic::new(
            TopicId::random(),
            section.id(),
            TopicText::parse(format!("topic {order}")).unwrap(),
            order,
        )
    }

    #[test]
    fn half_done_section() {
        let a = section();
        let t1 = topic(&a, 1);
        let t2 = topic(&a, 2);
        let completed: CompletedSet = [t1.id()].into_iter().collect();

        let progress = section_progress(&a, &[t1, t2], &completed);
        assert_eq!(progress.completed_count, 1);
        assert_eq!(progress.total_count, 2);
        assert_eq!(progress.percentage.value(), 50.0);
        assert!(!progress.is_complete());
        assert_eq!(progress.remaining(), 1);
    }

    #[test]
    fn full_only_when_every_topic_is_done() {
        let a = section();
        let topics: Vec<Topic> = (1..=3).map(|i| topic(&a, i)).collect();
        let mut completed = CompletedSet::new();

        for (i, t) in topics.iter().enumerate() {
            let progress = section_progress(&a, &topics, &completed);
            assert!(progress.percentage.value() < 100.0, "step {i}");
            assert!(progress.percentage.value() >= 0.0);
            completed.set(t.id(), true);
        }

        let progress = section_progress(&a, &topics, &completed);
        assert_eq!(progress.percentage, Percentage::FULL);
        assert!(progress.is_complete());
    }

    #[test]
    fn other_sections_do_not_count() {
        let a = section();
        let b = section();
        let ta = topic(&a, 1);
        let tb = topic(&b, 1);
        let completed: CompletedSet = [tb.id()].into_iter().collect();

        let progress = section_progress(&a, &[ta, tb], &completed);
        assert_eq!(progress.completed_count, 0);
        assert_eq!(progress.total_count, 1);
    }

    #[test]
    fn empty_universe_is_zero_percent() {
        let completed: CompletedSet = [TopicId::random()].into_iter().collect();
        let progress = overall_progress(&[], &completed);
        assert_eq!(progress.total_count, 0);
        assert_eq!(progress.percentage, Percentage::ZERO);
        assert!(!progress.is_complete());
    }

    #[test]
    fn unknown_marks_are_ignored() {
        let a = section();
        let t1 = topic(&a, 1);
        let completed: CompletedSet = [t1.id(), TopicId::random()].into_iter().collect();
        let progress = overall_progress(&[t1], &completed);
        assert_eq!(progress.completed_count, 1);
        assert_eq!(progress.percentage, Percentage::FULL);
    }

    #[test]
    fn order_does_not_matter() {
        let a = section();
        let mut topics: Vec<Topic> = (1..=5).map(|i| topic(&a, i)).collect();
        let completed: CompletedSet = topics.iter().take(2).map(Topic::id).collect();

        let forward = overall_progress(&topics, &completed);
        topics.reverse();
        let backward = overall_progress(&topics, &completed);
        assert_eq!(forward, backward);
        assert_eq!(forward.percentage.value(), 40.0);
    }

    #[test]
    fn clamps_external_values() {
        assert_eq!(Percentage::clamped(140.0), Percentage::FULL);
        assert_eq!(Percentage::clamped(-3.0), Percentage::ZERO);
        assert_eq!(Percentage::clamped(f64::NAN), Percentage::ZERO);
        assert_eq!(Percentage::from_counts(7, 3), Percentage::FULL);
    }

    #[test]
    fn displays_one_decimal() {
        assert_eq!(Percentage::from_counts(1, 3).to_string(), "33.3%");
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::model::{SectionId, TopicId, TopicText};

    /// Up to 40 topics spread over three sections, each flagged done or open.
    fn arb_curriculum() -> impl Strategy<Value = (Vec<Section>, Vec<(Topic, bool)>)> {
        prop::collection::vec((0usize..3, any::<bool>()), 0..40).prop_map(|rows| {
            let sections: Vec<Section> = (0..3u128)
                .map(|i| {
                    let title = format!("section {i}");
                    Section::new(SectionId::new(Uuid::from_u128(i + 1)), &title, "📘", i as i64 + 1)
                        .unwrap()
                })
                .collect();
            let topics = rows
                .into_iter()
                .enumerate()
                .map(|(order, (section, done))| {
                    let topic = Topic::new(
                        TopicId::new(Uuid::from_u128(1_000 + order as u128)),
                        sections[section].id(),
                        TopicText::parse(format!("topic {order}")).unwrap(),
                        order as i64,
                    );
                    (topic, done)
                })
                .collect();
            (sections, topics)
        })
    }

    fn split(rows: &[(Topic, bool)]) -> (Vec<Topic>, CompletedSet) {
        let topics = rows.iter().map(|(t, _)| t.clone()).collect();
        let completed = rows.iter().filter(|(_, done)| *done).map(|(t, _)| t.id()).collect();
        (topics, completed)
    }

    proptest! {
        #[test]
        fn section_percentage_stays_in_bounds((sections, rows) in arb_curriculum()) {
            let (topics, completed) = split(&rows);
            for section in &sections {
                let progress = section_progress(section, &topics, &completed);
                prop_assert!(progress.completed_count <= progress.total_count);
                prop_assert!((0.0..=100.0).contains(&progress.percentage.value()));
            }
            let overall = overall_progress(&topics, &completed);
            prop_assert!((0.0..=100.0).contains(&overall.percentage.value()));
        }

        #[test]
        fn full_iff_every_section_topic_is_done((sections, rows) in arb_curriculum()) {
            let (topics, completed) = split(&rows);
            for section in &sections {
                let own: Vec<&(Topic, bool)> = rows
                    .iter()
                    .filter(|(t, _)| t.section_id() == section.id())
                    .collect();
                let all_done = !own.is_empty() && own.iter().all(|(_, done)| *done);
                let progress = section_progress(section, &topics, &completed);
                prop_assert_eq!(progress.percentage == Percentage::FULL, all_done);
                prop_assert_eq!(progress.is_complete(), all_done);
            }
        }

        #[test]
        fn reordering_topics_changes_nothing(
            (sections, rows, shuffled) in arb_curriculum().prop_flat_map(|(sections, rows)| {
                (Just(sections), Just(rows.clone()), Just(rows).prop_shuffle())
            })
        ) {
            let (topics, completed) = split(&rows);
            let (reordered, _) = split(&shuffled);
            for section in &sections {
                prop_assert_eq!(
                    section_progress(section, &topics, &completed),
                    section_progress(section, &reordered, &completed)
                );
            }
            prop_assert_eq!(
                overall_progress(&topics, &completed),
                overall_progress(&reordered, &completed)
            );
        }
    }
}
