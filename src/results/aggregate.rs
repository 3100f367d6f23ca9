//! Aggregation of raw results into per-method rollups
//!
//! Units are grouped by the group and method of their source. Units without
//! a resolvable source are left out of the grouped view.

use std::collections::{BTreeSet, HashMap};
use std::ops::{Add, AddAssign};
use std::slice;
use std::sync::OnceLock;

use tracing::trace;

use super::collector::RawResultMap;
use crate::models::{Outcome, Status};

/// Tag that selects untagged data instead of a literal tag
pub const NO_TAG: &str = "No tag";

/// All outcomes and tags observed for one `(group, method)` pair
///
/// Read-only after construction so the cached predicates stay valid.
#[derive(Clone, Debug)]
pub struct AggregatedDatum {
    group: String,
    method: String,
    tags: BTreeSet<String>,
    outcomes: Vec<Outcome>,
    success: OnceLock<bool>,
    failure: OnceLock<bool>,
}

impl AggregatedDatum {
    pub fn new(
        group: impl Into<String>,
        method: impl Into<String>,
        tags: BTreeSet<String>,
        outcomes: Vec<Outcome>,
    ) -> Self {
        Self {
            group: group.into(),
            method: method.into(),
            tags,
            outcomes,
            success: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// At least one outcome, all of them succeeded
    pub fn is_success(&self) -> bool {
        *self.success.get_or_init(|| {
            !self.outcomes.is_empty() && self.outcomes.iter().all(Outcome::is_success)
        })
    }

    /// At least one outcome that did not succeed
    pub fn is_failure(&self) -> bool {
        *self
            .failure
            .get_or_init(|| self.outcomes.iter().any(|o| !o.is_success()))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl PartialEq for AggregatedDatum {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.method == other.method
            && self.tags == other.tags
            && self.outcomes == other.outcomes
    }
}

/// Ordered snapshot of aggregated data
///
/// Immutable once built; derived views are computed on first use.
#[derive(Clone, Debug, Default)]
pub struct AggregatedSet {
    data: Vec<AggregatedDatum>,
    succeeded: OnceLock<Box<AggregatedSet>>,
    failed: OnceLock<Box<AggregatedSet>>,
    not_tagged: OnceLock<Box<AggregatedSet>>,
}

impl AggregatedSet {
    pub fn new(data: Vec<AggregatedDatum>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Group a raw result map by source group and method
    pub fn from_results(results: &RawResultMap) -> Self {
        let mut pending: Vec<(&str, &str, BTreeSet<String>, Vec<Outcome>)> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();

        for (info, outcome) in results.iter() {
            let Some(source) = &info.source else {
                trace!("No source for {}, not aggregated", info.id);
                continue;
            };
            if source.group.is_empty() || source.method.is_empty() {
                trace!("Incomplete source for {}, not aggregated", info.id);
                continue;
            }

            let key = (source.group.as_str(), source.method.as_str());
            let i = *index.entry(key).or_insert_with(|| {
                pending.push((key.0, key.1, BTreeSet::new(), Vec::new()));
                pending.len() - 1
            });

            let (_, _, tags, outcomes) = &mut pending[i];
            tags.extend(info.tags.iter().cloned());
            outcomes.push(outcome.clone());
        }

        // Keep groups together in the order their first method was seen.
        let mut group_order: HashMap<&str, usize> = HashMap::new();
        for (group, ..) in &pending {
            let next = group_order.len();
            group_order.entry(*group).or_insert(next);
        }
        pending.sort_by_key(|(group, ..)| group_order.get(group).copied().unwrap_or(usize::MAX));

        pending
            .into_iter()
            .map(|(group, method, tags, outcomes)| {
                AggregatedDatum::new(group, method, tags, outcomes)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, AggregatedDatum> {
        self.data.iter()
    }

    pub fn data(&self) -> &[AggregatedDatum] {
        &self.data
    }

    fn filtered(&self, keep: impl Fn(&AggregatedDatum) -> bool) -> AggregatedSet {
        Self::new(self.data.iter().filter(|d| keep(d)).cloned().collect())
    }

    /// Data whose outcomes all succeeded
    pub fn succeeded(&self) -> &AggregatedSet {
        self.succeeded
            .get_or_init(|| Box::new(self.filtered(AggregatedDatum::is_success)))
    }

    /// Data with at least one outcome that did not succeed
    pub fn failed(&self) -> &AggregatedSet {
        self.failed
            .get_or_init(|| Box::new(self.filtered(AggregatedDatum::is_failure)))
    }

    /// Data without any tag
    pub fn not_tagged(&self) -> &AggregatedSet {
        self.not_tagged
            .get_or_init(|| Box::new(self.filtered(|d| d.tags.is_empty())))
    }

    /// Data carrying `tag`; [`NO_TAG`] selects untagged data instead
    pub fn tagged(&self, tag: &str) -> AggregatedSet {
        if tag.eq_ignore_ascii_case(NO_TAG) {
            return self.not_tagged().clone();
        }
        self.filtered(|d| d.has_tag(tag))
    }

    /// Split into one set per group, in order of appearance
    pub fn by_group(&self) -> Vec<(String, AggregatedSet)> {
        let mut groups: Vec<(String, Vec<AggregatedDatum>)> = Vec::new();
        for datum in &self.data {
            match groups.iter_mut().find(|(g, _)| *g == datum.group) {
                Some((_, data)) => data.push(datum.clone()),
                None => groups.push((datum.group.clone(), vec![datum.clone()])),
            }
        }
        groups
            .into_iter()
            .map(|(group, data)| (group, AggregatedSet::new(data)))
            .collect()
    }

    /// Total number of outcomes with the given status
    pub fn count(&self, status: Status) -> usize {
        self.data.iter().map(|d| d.count(status)).sum()
    }
}

impl PartialEq for AggregatedSet {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl From<Vec<AggregatedDatum>> for AggregatedSet {
    fn from(data: Vec<AggregatedDatum>) -> Self {
        Self::new(data)
    }
}

impl FromIterator<AggregatedDatum> for AggregatedSet {
    fn from_iter<I: IntoIterator<Item = AggregatedDatum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AggregatedSet {
    type Item = &'a AggregatedDatum;
    type IntoIter = slice::Iter<'a, AggregatedDatum>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Appends the data of both sets
impl Add for AggregatedSet {
    type Output = AggregatedSet;

    fn add(self, rhs: AggregatedSet) -> AggregatedSet {
        let mut data = self.data;
        data.extend(rhs.data);
        AggregatedSet::new(data)
    }
}

impl AddAssign for AggregatedSet {
    fn add_assign(&mut self, rhs: AggregatedSet) {
        let mut data = std::mem::take(&mut self.data);
        data.extend(rhs.data);
        *self = AggregatedSet::new(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpaqueFailure, UnitInfo, UnitType};

    fn info(id: &str, group: &str, method: &str, tags: &[&str]) -> UnitInfo {
        let mut info = UnitInfo::new(id, UnitType::Leaf);
        info.source = Some(crate::models::MethodSource::new(group, method));
        info.tags = tags.iter().map(|t| t.to_string()).collect();
        info
    }

    fn datum(method: &str, tags: &[&str], outcomes: Vec<Outcome>) -> AggregatedDatum {
        AggregatedDatum::new(
            "g",
            method,
            tags.iter().map(|t| t.to_string()).collect(),
            outcomes,
        )
    }

    #[test]
    fn test_repeated_method_is_one_datum() {
        let mut results = RawResultMap::new();
        results.merge(&info("pkg.A::m[1]", "pkg.A", "m", &[]), Outcome::succeeded());
        results.merge(
            &info("pkg.A::m[2]", "pkg.A", "m", &[]),
            Outcome::failed(OpaqueFailure::new("E", "boom")),
        );

        let set = AggregatedSet::from_results(&results);
        assert_eq!(set.len(), 1);

        let datum = &set.data()[0];
        assert_eq!(datum.group(), "pkg.A");
        assert_eq!(datum.method(), "m");
        let statuses: Vec<_> = datum.outcomes().iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![Status::Succeeded, Status::Failed]);
        assert!(datum.is_failure());
        assert!(!datum.is_success());
    }

    #[test]
    fn test_units_without_source_are_dropped() {
        let mut results = RawResultMap::new();
        results.merge(&UnitInfo::new("root", UnitType::Group), Outcome::succeeded());
        results.merge(&info("x", "", "m", &[]), Outcome::succeeded());
        results.merge(&info("y", "g", "", &[]), Outcome::succeeded());
        results.merge(&info("z", "g", "m", &[]), Outcome::succeeded());

        let set = AggregatedSet::from_results(&results);
        assert_eq!(set.len(), 1);
        assert_eq!(set.data()[0].method(), "m");
    }

    #[test]
    fn test_tags_are_unioned_and_groups_kept_together() {
        let mut results = RawResultMap::new();
        results.merge(&info("1", "A", "m", &["Easy"]), Outcome::succeeded());
        results.merge(&info("2", "B", "n", &[]), Outcome::succeeded());
        results.merge(&info("3", "A", "k", &[]), Outcome::succeeded());
        results.merge(&info("4", "A", "m", &["Hard"]), Outcome::succeeded());

        let set = AggregatedSet::from_results(&results);
        let keys: Vec<_> = set
            .iter()
            .map(|d| (d.group(), d.method()))
            .collect();
        assert_eq!(keys, vec![("A", "m"), ("A", "k"), ("B", "n")]);
        let expected: BTreeSet<String> = ["Easy", "Hard"].iter().map(|t| t.to_string()).collect();
        assert_eq!(set.data()[0].tags(), &expected);
        assert_eq!(set.data()[0].outcomes().len(), 2);
    }

    #[test]
    fn test_predicates_are_exclusive() {
        let empty = datum("e", &[], Vec::new());
        assert!(!empty.is_success());
        assert!(!empty.is_failure());

        let cases = vec![
            vec![Outcome::succeeded()],
            vec![Outcome::aborted("skip")],
            vec![Outcome::succeeded(), Outcome::not_implemented("x")],
            vec![Outcome::timed_out(std::time::Duration::from_secs(1))],
        ];
        for outcomes in cases {
            let d = datum("m", &[], outcomes);
            assert_ne!(d.is_success(), d.is_failure());
        }
    }

    #[test]
    fn test_cached_predicates_follow_outcomes() {
        let mut results = RawResultMap::new();
        results.merge(&info("1", "g", "m", &[]), Outcome::succeeded());
        let before = AggregatedSet::from_results(&results);
        assert!(before.data()[0].is_success());
        assert_eq!(before.succeeded().len(), 1);

        results.merge(
            &info("2", "g", "m", &[]),
            Outcome::failed(OpaqueFailure::new("E", "late")),
        );
        let after = AggregatedSet::from_results(&results);
        let datum = &after.data()[0];
        assert_eq!(datum.outcomes().len(), 2);
        assert!(!datum.is_success());
        assert!(datum.is_failure());
        assert!(after.succeeded().is_empty());

        // The earlier snapshot keeps its own, still consistent view.
        assert!(before.data()[0].is_success());
        assert!(!before.data()[0].is_failure());
    }

    #[test]
    fn test_no_tag_sentinel() {
        let set = AggregatedSet::new(vec![
            datum("a", &["Easy"], vec![Outcome::succeeded()]),
            datum("b", &[], vec![Outcome::succeeded()]),
            datum("c", &[], vec![Outcome::aborted("skip")]),
        ]);

        let untagged = set.tagged(NO_TAG);
        assert_eq!(&untagged, set.not_tagged());
        assert_eq!(set.tagged("no tag"), untagged);
        assert!(untagged.iter().all(|d| d.tags().is_empty()));
        assert_eq!(untagged.len(), 2);

        assert_eq!(set.tagged("Easy").len(), 1);
        assert_eq!(set.tagged("Hard").len(), 0);
    }

    #[test]
    fn test_views_and_addition() {
        let left = AggregatedSet::new(vec![datum("a", &[], vec![Outcome::succeeded()])]);
        let right = AggregatedSet::new(vec![datum(
            "b",
            &["Easy"],
            vec![Outcome::failed(OpaqueFailure::new("E", "x"))],
        )]);

        let mut all = left.clone() + right.clone();
        assert_eq!(all.len(), 2);
        assert_eq!(all.succeeded().len(), 1);
        assert_eq!(all.failed().len(), 1);
        assert_eq!(all.tagged("Easy").failed().len(), 1);
        assert_eq!(all.count(Status::Failed), 1);

        all += left;
        assert_eq!(all.len(), 3);
        assert_eq!(all.succeeded().len(), 2);
    }

    #[test]
    fn test_by_group() {
        let b = AggregatedDatum::new("other", "x", BTreeSet::new(), vec![Outcome::succeeded()]);
        let set = AggregatedSet::new(vec![
            datum("a", &[], vec![Outcome::succeeded()]),
            b,
            datum("c", &[], vec![Outcome::succeeded()]),
        ]);

        let groups = set.by_group();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "g");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "other");
    }
}
