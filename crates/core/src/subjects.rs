//! Top level of the dashboard drill-down: content totals per subject family.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{Subject, SubjectId};

/// Content total for one subject family (curriculum-level variants merged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectTotal {
    /// Base name shared by the variants; usable as a topic-query prefix.
    pub name: String,
    pub count: u64,
}

/// Sum per-subject counts into their base-name families.
///
/// Every family appears even when nothing is authored for it. Ordered by
/// count descending, then name.
#[must_use]
pub fn aggregate_subjects(
    subjects: &[Subject],
    counts_by_subject: &HashMap<SubjectId, u64>,
) -> Vec<SubjectTotal> {
    let mut families: BTreeMap<&str, u64> = BTreeMap::new();
    for subject in subjects {
        let count = counts_by_subject.get(&subject.id()).copied().unwrap_or(0);
        *families.entry(subject.base_name()).or_insert(0) += count;
    }

    let mut totals: Vec<SubjectTotal> = families
        .into_iter()
        .map(|(name, count)| SubjectTotal {
            name: name.to_string(),
            count,
        })
        .collect();
    totals.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    totals
}
