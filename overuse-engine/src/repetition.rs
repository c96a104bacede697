//! Detection of procedures performed more than once.

use serde::{Deserialize, Serialize};

use crate::taxonomy::CategoryCounts;

/// Summary text used when nothing repeats.
pub const NO_REPETITION: &str = "Nenhuma repetição relevante";

/// A procedure type (or category) seen more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedGroup {
    pub name: String,
    pub count: u32,
}

/// Groups with `count > 1`, in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionSummary {
    pub groups: Vec<RepeatedGroup>,
}

impl RepetitionSummary {
    /// Groups completed procedures by exact type name. This is the variant the
    /// feature vector uses.
    pub fn by_procedure_type<'a, I>(type_names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tallies: Vec<(&'a str, u32)> = Vec::new();
        for name in type_names {
            match tallies.iter_mut().find(|(seen, _)| *seen == name) {
                Some((_, count)) => *count += 1,
                None => tallies.push((name, 1)),
            }
        }

        let groups = tallies
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, count)| RepeatedGroup {
                name: name.to_string(),
                count,
            })
            .collect();
        Self { groups }
    }

    /// Legacy category-level variant: a category counts as repeated when more
    /// than one completed procedure mapped to it. Not used for scoring.
    pub fn by_category(counts: &CategoryCounts) -> Self {
        let groups = counts
            .iter()
            .filter(|(_, count)| *count > 1)
            .map(|(category, count)| RepeatedGroup {
                name: category.display_name().to_string(),
                count,
            })
            .collect();
        Self { groups }
    }

    /// Number of repeated groups.
    pub fn count(&self) -> u32 {
        self.groups.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// `"<name> (<n> vezes), ..."`, or [`NO_REPETITION`].
    pub fn describe(&self) -> String {
        if self.groups.is_empty() {
            return NO_REPETITION.to_string();
        }
        self.groups
            .iter()
            .map(|group| format!("{} ({} vezes)", group.name, group.count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Category;

    #[test]
    fn only_groups_above_two_are_listed_in_first_seen_order() {
        let names = [
            "Raspagem de tártaro",
            "Alívio de dor",
            "Raspagem de tártaro",
            "Radiografia intraoral",
            "Alívio de dor",
            "Raspagem de tártaro",
        ];
        let summary = RepetitionSummary::by_procedure_type(names);
        assert_eq!(summary.count(), 2);
        assert_eq!(
            summary.describe(),
            "Raspagem de tártaro (3 vezes), Alívio de dor (2 vezes)"
        );
    }

    #[test]
    fn no_repetition_uses_sentinel() {
        let summary = RepetitionSummary::by_procedure_type(["A", "B"]);
        assert!(summary.is_empty());
        assert_eq!(summary.describe(), NO_REPETITION);
    }

    #[test]
    fn unmapped_names_still_count_as_repetition() {
        let summary = RepetitionSummary::by_procedure_type(["Procedimento X", "Procedimento X"]);
        assert_eq!(summary.count(), 1);
    }

    #[test]
    fn category_variant_merges_distinct_procedures() {
        let mut counts = CategoryCounts::default();
        counts.increment(Category::Periodontics);
        counts.increment(Category::Periodontics);
        counts.increment(Category::Aesthetic);
        let summary = RepetitionSummary::by_category(&counts);
        assert_eq!(summary.describe(), "Periodontia (2 vezes)");
    }
}
