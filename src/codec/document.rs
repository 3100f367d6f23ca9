//! Result document layout
//!
//! ```text
//! { data: [ { packageName, methodName, tags: [..],
//!             results: [ { status, failure? } ] } ] }
//! ```

use serde::{Deserialize, Serialize};

use super::failure::FailureDatum;
use crate::models::{Outcome, Status};
use crate::results::{AggregatedDatum, AggregatedSet};

/// Status as written in the document
///
/// Timeouts are written as `FAILED` with a [`FailureDatum::Timeout`] failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireStatus {
    Successful,
    Aborted,
    Failed,
    NotImplemented,
}

impl From<Status> for WireStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Succeeded => WireStatus::Successful,
            Status::Aborted => WireStatus::Aborted,
            Status::Failed | Status::TimedOut => WireStatus::Failed,
            Status::NotImplemented => WireStatus::NotImplemented,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultDatum {
    pub status: WireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDatum>,
}

impl From<&Outcome> for ResultDatum {
    fn from(outcome: &Outcome) -> Self {
        let failure = match outcome.status {
            Status::TimedOut => Some(FailureDatum::Timeout(outcome.failure.clone())),
            _ => outcome.failure.clone().map(FailureDatum::Detail),
        };
        Self {
            status: outcome.status.into(),
            failure,
        }
    }
}

impl From<ResultDatum> for Outcome {
    fn from(datum: ResultDatum) -> Self {
        let timed_out = datum.failure.as_ref().is_some_and(FailureDatum::is_timeout);
        let status = match datum.status {
            WireStatus::Successful => Status::Succeeded,
            WireStatus::Aborted => Status::Aborted,
            WireStatus::NotImplemented => Status::NotImplemented,
            WireStatus::Failed if timed_out => Status::TimedOut,
            WireStatus::Failed => Status::Failed,
        };
        Outcome::new(status, datum.failure.and_then(FailureDatum::into_detail))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatumEntry {
    pub package_name: String,
    pub method_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub results: Vec<ResultDatum>,
}

impl From<&AggregatedDatum> for DatumEntry {
    fn from(datum: &AggregatedDatum) -> Self {
        Self {
            package_name: datum.group().to_string(),
            method_name: datum.method().to_string(),
            tags: datum.tags().iter().cloned().collect(),
            results: datum.outcomes().iter().map(ResultDatum::from).collect(),
        }
    }
}

impl From<DatumEntry> for AggregatedDatum {
    fn from(entry: DatumEntry) -> Self {
        AggregatedDatum::new(
            entry.package_name,
            entry.method_name,
            entry.tags.into_iter().collect(),
            entry.results.into_iter().map(Outcome::from).collect(),
        )
    }
}

/// Top-level result document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    #[serde(default)]
    pub data: Vec<DatumEntry>,
}

impl From<&AggregatedSet> for ResultDocument {
    fn from(set: &AggregatedSet) -> Self {
        Self {
            data: set.iter().map(DatumEntry::from).collect(),
        }
    }
}

impl From<ResultDocument> for AggregatedSet {
    fn from(doc: ResultDocument) -> Self {
        doc.data.into_iter().map(AggregatedDatum::from).collect()
    }
}
