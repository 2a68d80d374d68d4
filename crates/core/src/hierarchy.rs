//! Topic-hierarchy rollups for the content dashboard.
//!
//! Labels arrive as flat records with a parent back-reference. [`LabelForest`]
//! rebuilds the tree as an id-keyed arena, [`Rollup`] computes per-label totals
//! and leaf completion with memo tables that live for one call only, and
//! [`aggregate_level`] answers a single drill-down level with curriculum
//! variants (same numbering) merged into one entry.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::model::{Label, LabelId};

//
// ─── FOREST ────────────────────────────────────────────────────────────────────
//

/// Arena of labels with parent → children adjacency.
#[derive(Debug, Clone, Default)]
pub struct LabelForest {
    labels: HashMap<LabelId, Label>,
    children: HashMap<LabelId, Vec<LabelId>>,
    roots: Vec<LabelId>,
}

impl LabelForest {
    /// Build the forest in one pass over the fetched labels.
    ///
    /// A label is a root when it has no parent, when its parent was not part
    /// of the fetched set, or when it names itself as parent. Roots and child
    /// lists are ordered by id. Duplicate ids keep the first record seen.
    #[must_use]
    pub fn build(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut by_id: HashMap<LabelId, Label> = HashMap::new();
        for label in labels {
            by_id.entry(label.id()).or_insert(label);
        }

        let mut ids: Vec<LabelId> = by_id.keys().copied().collect();
        ids.sort_unstable();

        let mut children: HashMap<LabelId, Vec<LabelId>> = HashMap::new();
        let mut roots = Vec::new();
        for id in ids {
            match by_id[&id].parent_id() {
                Some(parent) if parent == id => {
                    warn!(label = %id, "label is its own parent; placing it at the root");
                    roots.push(id);
                }
                Some(parent) if by_id.contains_key(&parent) => {
                    children.entry(parent).or_default().push(id);
                }
                _ => roots.push(id),
            }
        }

        Self {
            labels: by_id,
            children,
            roots,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: LabelId) -> bool {
        self.labels.contains_key(&id)
    }

    #[must_use]
    pub fn roots(&self) -> &[LabelId] {
        &self.roots
    }

    /// Direct children of `id`; empty for leaves and unknown ids.
    #[must_use]
    pub fn children(&self, id: LabelId) -> &[LabelId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_leaf(&self, id: LabelId) -> bool {
        self.children(id).is_empty()
    }

    /// Labels forming one drill-down level: roots, or the children of `parent`.
    ///
    /// A parent outside the forest yields an empty level.
    #[must_use]
    pub fn level(&self, parent: Option<LabelId>) -> &[LabelId] {
        match parent {
            None => &self.roots,
            Some(id) => self.children(id),
        }
    }
}

//
// ─── CONTENT TALLY ─────────────────────────────────────────────────────────────
//

/// Result of the content bulk fetches, keyed by topic label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTally {
    /// Items tagged directly with each label, honouring the status filter.
    pub counts: HashMap<LabelId, u64>,
    /// Labels carrying at least one item of any status.
    pub authored: HashSet<LabelId>,
}

impl ContentTally {
    #[must_use]
    pub fn new(counts: HashMap<LabelId, u64>, authored: HashSet<LabelId>) -> Self {
        Self { counts, authored }
    }

    #[must_use]
    pub fn own_count(&self, id: LabelId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_authored(&self, id: LabelId) -> bool {
        self.authored.contains(&id)
    }
}

//
// ─── ROLLUP ────────────────────────────────────────────────────────────────────
//

/// Leaf closure of a label: how many leaves sit beneath it and how many of
/// those have content. A leaf's closure is itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeafClosure {
    pub leaves: u64,
    pub authored: u64,
}

impl LeafClosure {
    /// `100 × authored / leaves`, or 0 when there are no leaves.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio_percent(self) -> f64 {
        if self.leaves == 0 {
            return 0.0;
        }
        100.0 * self.authored as f64 / self.leaves as f64
    }

    #[must_use]
    pub fn percentage(self) -> u8 {
        round_percent(self.ratio_percent())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Memoised per-call computation of totals and leaf closures.
///
/// Create one per query and drop it afterwards; the memo tables must never
/// outlive the content snapshot they were computed from.
pub struct Rollup<'a> {
    forest: &'a LabelForest,
    tally: &'a ContentTally,
    totals: HashMap<LabelId, u64>,
    closures: HashMap<LabelId, LeafClosure>,
    visiting: HashSet<LabelId>,
}

impl<'a> Rollup<'a> {
    #[must_use]
    pub fn new(forest: &'a LabelForest, tally: &'a ContentTally) -> Self {
        Self {
            forest,
            tally,
            totals: HashMap::new(),
            closures: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Own count plus the totals of every child, recursively.
    pub fn total_count(&mut self, id: LabelId) -> u64 {
        if let Some(total) = self.totals.get(&id) {
            return *total;
        }
        if !self.visiting.insert(id) {
            warn!(label = %id, "cycle in label hierarchy; skipping back-edge");
            return 0;
        }

        let forest = self.forest;
        let mut total = self.tally.own_count(id);
        for child in forest.children(id) {
            total += self.total_count(*child);
        }

        self.visiting.remove(&id);
        self.totals.insert(id, total);
        total
    }

    pub fn leaf_closure(&mut self, id: LabelId) -> LeafClosure {
        if let Some(closure) = self.closures.get(&id) {
            return *closure;
        }
        if !self.visiting.insert(id) {
            warn!(label = %id, "cycle in label hierarchy; skipping back-edge");
            return LeafClosure::default();
        }

        let forest = self.forest;
        let closure = if forest.is_leaf(id) {
            LeafClosure {
                leaves: 1,
                authored: u64::from(self.tally.is_authored(id)),
            }
        } else {
            let mut acc = LeafClosure::default();
            for child in forest.children(id) {
                let sub = self.leaf_closure(*child);
                acc.leaves += sub.leaves;
                acc.authored += sub.authored;
            }
            acc
        };

        self.visiting.remove(&id);
        self.closures.insert(id, closure);
        closure
    }

    /// Leaf-ratio completion of a single label, rounded to a whole percent.
    pub fn completion_percentage(&mut self, id: LabelId) -> u8 {
        self.leaf_closure(id).percentage()
    }
}

//
// ─── LEVEL AGGREGATION ─────────────────────────────────────────────────────────
//

/// One reported entry of a drill-down level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAggregate {
    /// Representative label (lowest id of the merge group); drill-down target.
    pub id: LabelId,
    /// Every label merged into this entry, ascending.
    pub member_ids: Vec<LabelId>,
    pub display_label: String,
    pub count: u64,
    pub completion_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MergeKey {
    Numbering(String),
    Description(String),
    Id(LabelId),
}

fn merge_key(label: &Label) -> MergeKey {
    if let Some(numbering) = label.numbering() {
        return MergeKey::Numbering(numbering.to_string());
    }
    if !label.description().is_empty() {
        return MergeKey::Description(label.description().to_string());
    }
    MergeKey::Id(label.id())
}

/// Aggregate one drill-down level of the forest.
///
/// Selects the roots (`parent == None`) or the children of `parent`, merges
/// labels sharing a numbering (else description) into one entry, sums their
/// totals, averages their leaf-ratio completion, and orders the result by the
/// numeric components of the display label.
#[must_use]
pub fn aggregate_level(
    forest: &LabelForest,
    tally: &ContentTally,
    parent: Option<LabelId>,
) -> Vec<TopicAggregate> {
    let level = forest.level(parent);
    if level.is_empty() {
        return Vec::new();
    }

    let mut rollup = Rollup::new(forest, tally);

    let mut order: Vec<MergeKey> = Vec::new();
    let mut groups: HashMap<MergeKey, Vec<&Label>> = HashMap::new();
    for id in level {
        let Some(label) = forest.get(*id) else {
            continue;
        };
        let key = merge_key(label);
        let members = groups.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(label);
    }

    let mut entries: Vec<TopicAggregate> = order
        .iter()
        .filter_map(|key| groups.get(key))
        .filter_map(|members| {
            let first = members.first()?;
            let mut count = 0;
            let mut completion_sum = 0.0;
            for label in members {
                count += rollup.total_count(label.id());
                completion_sum += rollup.leaf_closure(label.id()).ratio_percent();
            }
            #[allow(clippy::cast_precision_loss)]
            let completion = completion_sum / members.len() as f64;

            Some(TopicAggregate {
                id: first.id(),
                member_ids: members.iter().map(|l| l.id()).collect(),
                display_label: display_label(first),
                count,
                completion_percentage: round_percent(completion),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        compare_display(&a.display_label, &b.display_label).then_with(|| a.id.cmp(&b.id))
    });
    entries
}

//
// ─── DISPLAY & ORDERING ────────────────────────────────────────────────────────
//

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ':' || c == '-'
}

/// Descriptions that already lead with a section code such as `S2`.
fn starts_with_section_code(description: &str) -> bool {
    let mut chars = description.chars();
    chars.next() == Some('S') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Render `"<numbering>: <description>"` without repeating a numbering the
/// description already starts with.
///
/// `"2.1: Derivatives"` numbered `2.1` renders as `"2.1: Derivatives"`, while
/// `"2.10 Limits"` numbered `2.1` keeps its text since `2.1` is not a whole
/// prefix there.
#[must_use]
pub fn display_label(label: &Label) -> String {
    let description = label.description();
    let Some(numbering) = label.numbering() else {
        return description.to_string();
    };
    if starts_with_section_code(description) {
        return description.to_string();
    }

    let rest = match description.strip_prefix(numbering) {
        Some(rest) if rest.is_empty() || rest.starts_with(is_separator) => {
            rest.trim_start_matches(is_separator)
        }
        _ => description,
    };

    if rest.is_empty() {
        numbering.to_string()
    } else {
        format!("{numbering}: {rest}")
    }
}

/// Digit runs found before the first colon of a display label.
///
/// Returns `None` when there are no digits or a run does not fit in `u64`.
#[must_use]
pub fn numeric_key(display: &str) -> Option<Vec<u64>> {
    let head = display.split(':').next().unwrap_or_default();
    let mut key = Vec::new();
    for run in head
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
    {
        key.push(run.parse::<u64>().ok()?);
    }
    if key.is_empty() { None } else { Some(key) }
}

/// Numeric keys first (tuple order, shorter prefixes first), then the rest by
/// raw string.
#[must_use]
pub fn compare_display(a: &str, b: &str) -> Ordering {
    match (numeric_key(a), numeric_key(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

//
// ─── CHART SERIES ──────────────────────────────────────────────────────────────
//

/// Parallel arrays in the shape a bar chart consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    pub ids: Vec<LabelId>,
    pub completion: Vec<u8>,
}

impl From<&[TopicAggregate]> for ChartSeries {
    fn from(entries: &[TopicAggregate]) -> Self {
        let mut series = ChartSeries::default();
        for entry in entries {
            series.labels.push(entry.display_label.clone());
            series.data.push(entry.count);
            series.ids.push(entry.id);
            series.completion.push(entry.completion_percentage);
        }
        series
    }
}
