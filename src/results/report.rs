//! Summary rows for reporting sinks
//!
//! A summary row counts, per tag, the methods of one group that fully
//! succeeded. Rows are stamped with the time they were built and with the
//! author and owner of the graded submission.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use super::aggregate::{AggregatedSet, NO_TAG};

/// Tags reported when none are configured
pub const DEFAULT_TAGS: [&str; 7] = [
    "Example",
    "Trivial",
    "Easy",
    "Normal",
    "Hard",
    "Impossible",
    NO_TAG,
];

/// Identity used when the author or owner file is missing
pub const UNKNOWN_IDENTITY: &str = "None";

pub fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}

/// Succeeded count for one tag
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub succeeded: usize,
    pub total: usize,
}

/// One reporting row per group
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryRow {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub owner: String,
    pub group: String,
    pub counts: Vec<TagCount>,
}

impl SummaryRow {
    pub fn succeeded(&self, tag: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|c| c.tag == tag)
            .map(|c| c.succeeded)
    }

    fn record(&self) -> Vec<String> {
        let mut record = vec![
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.author.clone(),
            self.owner.clone(),
            self.group.clone(),
        ];
        record.extend(self.counts.iter().map(|c| c.succeeded.to_string()));
        record
    }
}

/// Tag counts over a whole set
pub fn tag_counts(set: &AggregatedSet, tags: &[String]) -> Vec<TagCount> {
    tags.iter()
        .map(|tag| {
            let tagged = set.tagged(tag);
            TagCount {
                tag: tag.clone(),
                succeeded: tagged.succeeded().len(),
                total: tagged.len(),
            }
        })
        .collect()
}

/// Build one row per group of `set`
pub fn summary_rows(
    set: &AggregatedSet,
    tags: &[String],
    author: &str,
    owner: &str,
) -> Vec<SummaryRow> {
    let timestamp = Utc::now();
    set.by_group()
        .into_iter()
        .map(|(group, data)| SummaryRow {
            timestamp,
            author: author.to_string(),
            owner: owner.to_string(),
            group,
            counts: tag_counts(&data, tags),
        })
        .collect()
}

/// First line of an identity file, or [`UNKNOWN_IDENTITY`]
pub fn read_identity(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .unwrap_or(UNKNOWN_IDENTITY)
            .to_string(),
        Err(e) => {
            debug!("No identity in {}: {}", path.display(), e);
            UNKNOWN_IDENTITY.to_string()
        }
    }
}

/// Write rows as CSV with one column per tag
pub fn write_csv<W: Write>(writer: W, rows: &[SummaryRow], tags: &[String]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["timestamp", "author", "owner", "group"];
    header.extend(tags.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in rows {
        writer.write_record(row.record())?;
    }
    writer.flush().context("Failed to write summary rows")?;
    Ok(())
}
