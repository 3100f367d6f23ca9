//! Result collection, aggregation and storage
//!
//! Turns per-unit outcomes into grouped rollups, persists them and builds
//! summary rows for reporting.

mod aggregate;
mod collector;
mod report;
mod storage;

pub use aggregate::{AggregatedDatum, AggregatedSet, NO_TAG};
pub use collector::{RawResultMap, ResultCollector};
pub use report::{
    default_tags, read_identity, summary_rows, tag_counts, write_csv, SummaryRow, TagCount,
    DEFAULT_TAGS, UNKNOWN_IDENTITY,
};
pub use storage::{ExportFormat, ResultsStorage, DEFAULT_RESULT_FILE};
