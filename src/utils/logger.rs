//! Logging utilities
//!
//! Provides logging configuration and helpers.

use std::fmt;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Variable whose value, when set, replaces the computed filter
pub const LOG_ENV: &str = "UNITGRADE_LOG";

/// Log level configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level from the configured name, raised to debug by `--verbose`
    pub fn resolve(configured: &str, verbose: bool) -> Self {
        let level = Self::from_str(configured).unwrap_or_default();
        if verbose && level.to_tracing_level() < Level::DEBUG {
            LogLevel::Debug
        } else {
            level
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tracing_level())
    }
}

/// Filter directive enabling `level` for this crate only
pub fn filter_directive(level: LogLevel) -> String {
    format!("unitgrade={level}")
}

/// Initialize the logger with specified level
///
/// A directive in `UNITGRADE_LOG` that is not a bare level name is used as
/// the whole filter. Does nothing if a subscriber is already installed.
pub fn init_logger(level: LogLevel) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| LogLevel::from_str(value).is_none())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(filter_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
