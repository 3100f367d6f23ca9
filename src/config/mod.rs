//! Configuration module
//!
//! Handles loading and managing configuration. Settings come from a config
//! file (YAML or JSON) with environment variable overrides on top.

mod env;
mod file;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard, ENV_PREFIX};
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::results::{default_tags, DEFAULT_RESULT_FILE};

/// Default per-unit timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 50;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Per-unit timeout in seconds, `None` for no limit
    #[serde(default = "default_timeout")]
    pub timeout_secs: Option<u64>,

    /// Destination of the result document
    pub result_file: PathBuf,

    /// Maximum top-level units run at once
    pub max_concurrent: usize,

    /// File holding the submission author's name
    pub author_file: PathBuf,

    /// File holding the submission owner's name
    pub owner_file: PathBuf,

    /// Tags counted in summary rows
    pub summary_tags: Vec<String>,

    pub log_level: String,
}

fn default_timeout() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_SECS)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            result_file: PathBuf::from(DEFAULT_RESULT_FILE),
            max_concurrent: 1,
            author_file: PathBuf::from("author.name"),
            owner_file: PathBuf::from("owner.name"),
            summary_tags: default_tags(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Effective configuration: config file, then environment overrides
    ///
    /// The file named by `UNITGRADE_CONFIG` wins over `path`, which wins
    /// over the standard locations.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();
        let explicit = env.config_file.as_deref().map(Path::new).or(path);

        let file = match explicit {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };

        let mut config = file.app;
        config.apply_env(&env);
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(secs) = env.timeout {
            self.timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(file) = &env.result_file {
            self.result_file = PathBuf::from(file);
        }
        if let Some(n) = env.concurrency {
            self.max_concurrent = n.max(1);
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
    }

    /// Per-unit timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_secs = timeout.map(|t| t.as_secs().max(1));
        self
    }

    pub fn with_result_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_file = path.into();
        self
    }
}
