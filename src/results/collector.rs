//! Result collection
//!
//! Accumulates `(unit, outcome)` events into a map with at most one entry per
//! unit id. An entry that timed out is never overwritten.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::executor::ExecutionListener;
use crate::models::{Outcome, Status, UnitId, UnitInfo};

/// Latest accepted outcome per unit id, in first-insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResultMap {
    entries: Vec<(UnitInfo, Outcome)>,
    index: HashMap<UnitId, usize>,
}

impl RawResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event
    ///
    /// A `TimedOut` entry keeps its outcome; any other entry is replaced.
    /// The unit info and position of the first insertion are kept. Returns
    /// whether the update was accepted.
    pub fn merge(&mut self, info: &UnitInfo, outcome: Outcome) -> bool {
        match self.index.get(&info.id) {
            Some(&i) => {
                let existing = &mut self.entries[i].1;
                if existing.is_timed_out() {
                    debug!("Keeping timed-out result for {}", info.id);
                    return false;
                }
                *existing = outcome;
            }
            None => {
                self.index.insert(info.id.clone(), self.entries.len());
                self.entries.push((info.clone(), outcome));
            }
        }
        true
    }

    pub fn get(&self, id: &UnitId) -> Option<&Outcome> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitInfo, &Outcome)> {
        self.entries.iter().map(|(info, outcome)| (info, outcome))
    }

    /// Number of entries per status
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, outcome) in &self.entries {
            *counts.entry(outcome.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, status: Status) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.status == status)
            .count()
    }
}

/// Listener that records every finished unit into a [`RawResultMap`]
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Mutex<RawResultMap>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, info: &UnitInfo, outcome: Outcome) -> bool {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(info, outcome)
    }

    /// Copy of the results collected so far
    pub fn snapshot(&self) -> RawResultMap {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExecutionListener for ResultCollector {
    fn execution_finished(&self, unit: &UnitInfo, outcome: &Outcome) {
        self.record(unit, outcome.clone());
    }
}
