//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Re-analysis tool for unit test result documents
#[derive(Parser, Debug)]
#[command(name = "unitgrade")]
#[command(author = "hephaex@gmail.com")]
#[command(version)]
#[command(about = "Inspect, normalize and export graded test results")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (overrides the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the contents of a result document
    Summary(SummaryArgs),

    /// Decode and re-encode a result document
    Normalize(NormalizeArgs),

    /// Export a result document as JSON or CSV
    Export(ExportArgs),

    /// Write per-group summary rows as CSV
    Report(ReportArgs),

    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for summary command
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Result document (defaults to the configured result file)
    pub file: Option<PathBuf>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Show succeeded counts per tag (comma-separated; configured tags if empty)
    #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
    pub tags: Option<String>,
}

impl SummaryArgs {
    /// Tags requested with `--tags`, `None` when the configured set applies
    pub fn tag_list(&self) -> Option<Vec<String>> {
        let tags: Vec<String> = self
            .tags
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        (!tags.is_empty()).then_some(tags)
    }
}

/// Arguments for normalize command
#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    pub input: PathBuf,

    pub output: PathBuf,

    /// Pretty-print the output document
    #[arg(short, long)]
    pub pretty: bool,
}

/// Arguments for export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    pub input: PathBuf,

    /// Destination; the format follows its extension (.json or .csv)
    pub output: PathBuf,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Result document (defaults to the configured result file)
    pub file: Option<PathBuf>,

    /// Write rows to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Where to write it
        #[arg(short, long, default_value = "unitgrade.yaml")]
        path: PathBuf,
    },

    /// List environment variable overrides
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_args() {
        let args = Args::parse_from(["unitgrade", "summary", "results.json", "--format", "csv"]);
        match args.command {
            Command::Summary(summary) => {
                assert_eq!(summary.file, Some(PathBuf::from("results.json")));
                assert_eq!(summary.format, "csv");
                assert!(summary.tags.is_none());
            }
            _ => panic!("Expected Summary command"),
        }
    }

    #[test]
    fn test_tags_flag() {
        let args = Args::parse_from(["unitgrade", "summary", "--tags"]);
        match args.command {
            Command::Summary(summary) => {
                assert_eq!(summary.tags.as_deref(), Some(""));
                assert_eq!(summary.tag_list(), None);
            }
            _ => panic!("Expected Summary command"),
        }

        let args = Args::parse_from(["unitgrade", "summary", "--tags", "Easy, Hard"]);
        match args.command {
            Command::Summary(summary) => {
                assert_eq!(
                    summary.tag_list(),
                    Some(vec!["Easy".to_string(), "Hard".to_string()])
                );
            }
            _ => panic!("Expected Summary command"),
        }
    }

    #[test]
    fn test_normalize_and_config_args() {
        let args = Args::parse_from(["unitgrade", "-v", "normalize", "in.json", "out.json", "--pretty"]);
        assert!(args.verbose);
        match args.command {
            Command::Normalize(n) => {
                assert_eq!(n.input, PathBuf::from("in.json"));
                assert!(n.pretty);
            }
            _ => panic!("Expected Normalize command"),
        }

        let args = Args::parse_from(["unitgrade", "config", "init", "--path", "x.yaml"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { path },
            }) => assert_eq!(path, PathBuf::from("x.yaml")),
            _ => panic!("Expected Config init"),
        }
    }
}
