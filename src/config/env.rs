//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "UNITGRADE";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Timeout in seconds from UNITGRADE_TIMEOUT, 0 for no limit
    pub timeout: Option<u64>,
    /// Result document path from UNITGRADE_RESULT_FILE
    pub result_file: Option<String>,
    /// Concurrency from UNITGRADE_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Config file from UNITGRADE_CONFIG
    pub config_file: Option<String>,
    /// Log level from UNITGRADE_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            timeout: get_env_parse("TIMEOUT"),
            result_file: get_env("RESULT_FILE"),
            concurrency: get_env_parse("CONCURRENCY"),
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.result_file.is_some()
            || self.concurrency.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TIMEOUT:      {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_RESULT_FILE:  {:?}", ENV_PREFIX, self.result_file);
        println!("  {}_CONCURRENCY:  {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_CONFIG:       {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_LOG:          {:?}", ENV_PREFIX, self.log_level);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Builder for setting environment variables (useful for testing)
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    pub fn timeout(self, secs: u64) -> Self {
        self.var("TIMEOUT", secs.to_string())
    }

    pub fn result_file(self, path: impl Into<String>) -> Self {
        self.var("RESULT_FILE", path)
    }

    pub fn concurrency(self, n: usize) -> Self {
        self.var("CONCURRENCY", n.to_string())
    }

    pub fn config_file(self, path: impl Into<String>) -> Self {
        self.var("CONFIG", path)
    }

    pub fn log_level(self, level: impl Into<String>) -> Self {
        self.var("LOG", level)
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all UNITGRADE environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_TIMEOUT       Per-unit timeout in seconds (0 for no limit)");
    println!("  {ENV_PREFIX}_RESULT_FILE   Destination of the result document");
    println!("  {ENV_PREFIX}_CONCURRENCY   Top-level units run at once");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_LOG           Log level (trace, debug, info, warn, error)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.timeout.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .result_file("graded/results.json")
            .concurrency(4)
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.result_file, Some("graded/results.json".to_string()));
        assert_eq!(config.concurrency, Some(4));
        assert!(config.has_any());
    }

    #[test]
    fn test_env_guard_restores() {
        let key = format!("{ENV_PREFIX}_LOG");
        {
            let _guard = EnvBuilder::new().log_level("trace").apply_scoped();
            assert_eq!(env::var(&key).ok().as_deref(), Some("trace"));
        }
        assert!(env::var(&key).is_err());
    }
}
