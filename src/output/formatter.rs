//! Output formatters for result sets
//!
//! Provides table, JSON, CSV and one-line summary renderings.

use anyhow::Result;
use std::fmt::Write as _;

use crate::codec;
use crate::models::Status;
use crate::results::{AggregatedDatum, AggregatedSet, TagCount};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Render a whole result set
    pub fn format_set(&self, set: &AggregatedSet) -> String {
        match self.format {
            OutputFormat::Table => self.format_set_table(set),
            OutputFormat::Json => codec::to_string(set).unwrap_or_default(),
            OutputFormat::JsonPretty => codec::to_string_pretty(set).unwrap_or_default(),
            OutputFormat::Csv => self.format_set_csv(set).unwrap_or_default(),
            OutputFormat::Summary => self.format_set_summary(set),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.colorize {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn datum_status(&self, datum: &AggregatedDatum) -> String {
        if datum.is_success() {
            self.paint("✓ PASS", "32")
        } else if datum.count(Status::TimedOut) > 0 {
            self.paint("⧗ TIMEOUT", "33")
        } else if datum.is_failure() {
            self.paint("✗ FAIL", "31")
        } else {
            self.paint("○ EMPTY", "33")
        }
    }

    fn format_set_table(&self, set: &AggregatedSet) -> String {
        let mut output = String::new();

        for (group, data) in set.by_group() {
            let _ = writeln!(output, "\n{group}");
            let _ = writeln!(output, "{:-<70}", "");
            for datum in &data {
                let tags = if datum.tags().is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", join_tags(datum, ", "))
                };
                let passed = datum.count(Status::Succeeded);
                let _ = writeln!(
                    output,
                    "  {:30} {} {}/{}{}",
                    datum.method(),
                    self.datum_status(datum),
                    passed,
                    datum.outcomes().len(),
                    tags
                );
                for outcome in datum.outcomes().iter().filter(|o| !o.is_success()) {
                    if let Some(failure) = &outcome.failure {
                        let _ = writeln!(
                            output,
                            "      {} {}",
                            outcome.status.symbol(),
                            first_line(&failure.message())
                        );
                    }
                }
            }
        }

        let _ = writeln!(output, "\n{:=<70}", "");
        let _ = writeln!(output, "{}", self.format_set_summary(set));
        output
    }

    fn format_set_csv(&self, set: &AggregatedSet) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["group", "method", "tags", "outcomes", "succeeded", "status"])?;

        for datum in set {
            let status = if datum.is_success() {
                "PASS"
            } else if datum.is_failure() {
                "FAIL"
            } else {
                "EMPTY"
            };
            writer.write_record([
                datum.group().to_string(),
                datum.method().to_string(),
                join_tags(datum, ";"),
                datum.outcomes().len().to_string(),
                datum.count(Status::Succeeded).to_string(),
                status.to_string(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }

    fn format_set_summary(&self, set: &AggregatedSet) -> String {
        let total = set.len();
        let passed = set.succeeded().len();
        let rate = if total > 0 {
            passed as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        format!(
            "{}/{} methods passed ({:.1}%), {} failed, {} timed out",
            passed,
            total,
            rate,
            set.failed().len(),
            set.count(Status::TimedOut)
        )
    }

    /// Render per-tag succeeded counts
    pub fn format_tag_counts(&self, counts: &[TagCount]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(counts).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(counts).unwrap_or_default(),
            OutputFormat::Csv => tag_counts_csv(counts).unwrap_or_default(),
            OutputFormat::Table | OutputFormat::Summary => {
                let mut output = String::new();
                for c in counts {
                    let bar_len = if c.total > 0 { c.succeeded * 20 / c.total } else { 0 };
                    let _ = writeln!(
                        output,
                        " {:12} {}{} {:>3}/{:<3}",
                        c.tag,
                        "█".repeat(bar_len),
                        "░".repeat(20 - bar_len),
                        c.succeeded,
                        c.total
                    );
                }
                output
            }
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn tag_counts_csv(counts: &[TagCount]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["tag", "succeeded", "total"])?;
    for c in counts {
        writer.write_record([c.tag.clone(), c.succeeded.to_string(), c.total.to_string()])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn join_tags(datum: &AggregatedDatum, separator: &str) -> String {
    datum
        .tags()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
