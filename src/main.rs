//! unitgrade - result document re-analysis tool
//!
//! Loads result documents written by a test pass and renders, normalizes,
//! exports or summarizes them.
//!
//! ## Usage
//!
//! ```bash
//! # Show the configured result document as a table
//! unitgrade summary
//!
//! # Succeeded counts per tag
//! unitgrade summary results.json --tags Easy,Hard
//!
//! # Re-encode a document
//! unitgrade normalize old.json new.json --pretty
//!
//! # Per-group summary rows
//! unitgrade report --output summary.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;

mod cli;

use cli::{Args, Command, ConfigAction};
use unitgrade::config::{print_env_help, AppConfig, ConfigFile, EnvConfig};
use unitgrade::output::{OutputFormat, ResultFormatter};
use unitgrade::results::{
    read_identity, summary_rows, tag_counts, write_csv, ExportFormat, ResultsStorage,
};
use unitgrade::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::resolve(args.config.as_deref())?;
    init_logger(LogLevel::resolve(&config.log_level, args.verbose));

    match args.command {
        Command::Summary(summary_args) => show_summary(&config, summary_args)?,
        Command::Normalize(normalize_args) => normalize(normalize_args)?,
        Command::Export(export_args) => export(export_args)?,
        Command::Report(report_args) => write_report(&config, report_args)?,
        Command::Config(config_args) => manage_config(&config, config_args.action)?,
    }

    Ok(())
}

fn document_path(config: &AppConfig, file: Option<PathBuf>) -> PathBuf {
    file.unwrap_or_else(|| config.result_file.clone())
}

fn show_summary(config: &AppConfig, args: cli::SummaryArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format)
        .with_context(|| format!("Unknown output format: {}", args.format))?;
    let path = document_path(config, args.file.clone());
    let set = ResultsStorage::load_from_path(&path)?;

    let formatter = ResultFormatter::new(format);
    if args.tags.is_some() {
        let tags = args
            .tag_list()
            .unwrap_or_else(|| config.summary_tags.clone());
        print!("{}", formatter.format_tag_counts(&tag_counts(&set, &tags)));
    } else {
        println!("{}", formatter.format_set(&set));
    }
    Ok(())
}

fn normalize(args: cli::NormalizeArgs) -> Result<()> {
    let set = ResultsStorage::load_from_path(&args.input)?;
    let path = ResultsStorage::new(&args.output)
        .with_pretty(args.pretty)
        .save(&set)?;
    println!("✓ Normalized {} methods into {}", set.len(), path.display());
    Ok(())
}

fn export(args: cli::ExportArgs) -> Result<()> {
    let Some(format) = ExportFormat::from_extension(&args.output) else {
        anyhow::bail!(
            "Cannot infer export format from {}; use a .json or .csv extension",
            args.output.display()
        );
    };

    let set = ResultsStorage::load_from_path(&args.input)?;
    ResultsStorage::export(&set, &args.output, format)?;
    println!("✓ Exported {} methods to {}", set.len(), args.output.display());
    Ok(())
}

fn write_report(config: &AppConfig, args: cli::ReportArgs) -> Result<()> {
    let path = document_path(config, args.file);
    let set = ResultsStorage::load_from_path(&path)?;

    let author = read_identity(&config.author_file);
    let owner = read_identity(&config.owner_file);
    let rows = summary_rows(&set, &config.summary_tags, &author, &owner);
    info!("Built {} summary rows for {}", rows.len(), author);

    match args.output {
        Some(output) => {
            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            write_csv(BufWriter::new(file), &rows, &config.summary_tags)?;
            println!("✓ Wrote {} rows to {}", rows.len(), output.display());
        }
        None => write_csv(io::stdout().lock(), &rows, &config.summary_tags)?,
    }
    Ok(())
}

fn manage_config(config: &AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_yaml::to_string(config)?);
            let env = EnvConfig::load();
            if env.has_any() {
                env.print_summary();
            }
        }

        ConfigAction::Init { path } => {
            if path.exists() {
                anyhow::bail!("Configuration file already exists: {}", path.display());
            }
            ConfigFile::default().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
        }

        ConfigAction::Env => print_env_help(),
    }
    Ok(())
}
