//! Result document storage
//!
//! Saves and loads result documents and exports them as JSON or CSV.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::aggregate::AggregatedSet;
use crate::codec;

/// Default file name of the result document
pub const DEFAULT_RESULT_FILE: &str = "results.json";

/// Result document storage at a fixed destination
#[derive(Clone, Debug)]
pub struct ResultsStorage {
    path: PathBuf,
    pretty: bool,
}

impl ResultsStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the document to the destination, creating parent directories
    pub fn save(&self, set: &AggregatedSet) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&self.path).with_context(|| {
            format!("Failed to create results file {}", self.path.display())
        })?;
        let writer = BufWriter::new(file);
        codec::to_writer(writer, set, self.pretty).context("Failed to write results")?;

        info!("Saved {} results to {}", set.len(), self.path.display());
        Ok(self.path.clone())
    }

    pub fn load(&self) -> Result<AggregatedSet> {
        Self::load_from_path(&self.path)
    }

    pub fn load_from_path(path: &Path) -> Result<AggregatedSet> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file {}", path.display()))?;
        let reader = BufReader::new(file);
        let set = codec::from_reader(reader)
            .with_context(|| format!("Failed to parse results file {}", path.display()))?;

        debug!("Loaded {} results from {}", set.len(), path.display());
        Ok(set)
    }

    /// Export a result set to a file
    pub fn export(set: &AggregatedSet, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                codec::to_writer(BufWriter::new(file), set, true)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "group", "method", "tags", "attempt", "status", "failure_type", "message",
                ])?;

                for datum in set {
                    let tags = datum.tags().iter().cloned().collect::<Vec<_>>().join(";");
                    for (attempt, outcome) in datum.outcomes().iter().enumerate() {
                        let failure = outcome.failure.as_ref();
                        writer.write_record([
                            datum.group().to_string(),
                            datum.method().to_string(),
                            tags.clone(),
                            (attempt + 1).to_string(),
                            outcome.status.to_string(),
                            failure
                                .and_then(|f| f.opaque_type())
                                .unwrap_or_default()
                                .to_string(),
                            failure.map(|f| f.message()).unwrap_or_default(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

impl Default for ResultsStorage {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_FILE)
    }
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
