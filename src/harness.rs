//! Configured test pass
//!
//! Runs a suite with the configured timeout and concurrency, aggregates the
//! collected outcomes and writes the result document to the configured
//! destination.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::executor::{ExecutionListener, LogListener, Runner, Scheduler};
use crate::models::TestUnit;
use crate::results::{
    read_identity, summary_rows, AggregatedSet, RawResultMap, ResultCollector, ResultsStorage,
    SummaryRow,
};
use crate::utils::Timer;

/// Everything one pass produced
#[derive(Debug)]
pub struct PassResult {
    pub raw: RawResultMap,
    pub set: AggregatedSet,
    pub saved_to: PathBuf,
}

/// Config-driven pass driver
pub struct Harness {
    config: AppConfig,
    listeners: Vec<Arc<dyn ExecutionListener>>,
    log_units: bool,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
            log_units: true,
        }
    }

    /// Also report events to `listener`
    pub fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Turn per-unit log lines on or off
    pub fn with_unit_logging(mut self, enabled: bool) -> Self {
        self.log_units = enabled;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run a pass and save its result document
    ///
    /// Fails only if the document cannot be written.
    pub async fn run(&self, units: Vec<TestUnit>) -> Result<PassResult> {
        let timer = Timer::start("harness pass");
        let collector = Arc::new(ResultCollector::new());

        let mut runner = Runner::new(Scheduler::new(self.config.timeout()))
            .with_concurrency(self.config.max_concurrent)
            .with_listener(collector.clone());
        if self.log_units {
            runner = runner.with_listener(Arc::new(LogListener));
        }
        for listener in &self.listeners {
            runner = runner.with_listener(Arc::clone(listener));
        }

        runner.run(units).await;

        let raw = collector.snapshot();
        info!("Collected {} results: {:?}", raw.len(), raw.status_counts());

        let set = AggregatedSet::from_results(&raw);
        let saved_to = ResultsStorage::new(&self.config.result_file)
            .save(&set)
            .context("Failed to save pass results")?;

        timer.stop();
        Ok(PassResult { raw, set, saved_to })
    }

    /// Summary rows for a result set, one per group
    pub fn summary(&self, set: &AggregatedSet) -> Vec<SummaryRow> {
        let author = read_identity(&self.config.author_file);
        let owner = read_identity(&self.config.owner_file);
        summary_rows(set, &self.config.summary_tags, &author, &owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::request_exit;
    use crate::models::{check_eq, Status, UnitError};
    use crate::results::ResultsStorage;
    use std::time::Duration;
    use tempfile::tempdir;

    fn suite() -> Vec<TestUnit> {
        vec![
            TestUnit::group(
                "pkg.Sorting",
                vec![
                    TestUnit::method("pkg.Sorting", "empty", || Ok(())).with_tag("Trivial"),
                    TestUnit::invocation("pkg.Sorting", "random", 1, || Ok(())).with_tag("Easy"),
                    TestUnit::invocation("pkg.Sorting", "random", 2, || {
                        check_eq([("seed", 2)], vec![3, 1], vec![1, 3])
                    })
                    .with_tag("Easy"),
                    TestUnit::method("pkg.Sorting", "forever", || loop {
                        std::thread::sleep(Duration::from_millis(10));
                    }),
                ],
            ),
            TestUnit::group(
                "pkg.Exit",
                vec![TestUnit::method("pkg.Exit", "quits", || request_exit(1))],
            ),
            TestUnit::method("pkg.Todo", "later", || {
                Err(UnitError::not_implemented("later"))
            }),
        ]
    }

    #[tokio::test]
    async fn test_pass_writes_document() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default()
            .with_timeout(Some(Duration::from_secs(1)))
            .with_result_file(dir.path().join("results.json"));

        let result = Harness::new(config).run(suite()).await.unwrap();

        let set = &result.set;
        assert_eq!(set.len(), 5);
        let random = set.iter().find(|d| d.method() == "random").unwrap();
        assert_eq!(random.outcomes().len(), 2);
        assert!(random.is_failure());

        let forever = set.iter().find(|d| d.method() == "forever").unwrap();
        assert_eq!(forever.outcomes()[0].status, Status::TimedOut);

        let quits = set.iter().find(|d| d.method() == "quits").unwrap();
        assert_eq!(quits.outcomes()[0].status, Status::Failed);

        assert_eq!(set.succeeded().len(), 1);
        assert_eq!(set.tagged("No tag").len(), 3);

        let loaded = ResultsStorage::load_from_path(&result.saved_to).unwrap();
        assert_eq!(&loaded, set);
    }

    #[tokio::test]
    async fn test_unwritable_destination_propagates() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default().with_result_file(dir.path());

        let units = vec![TestUnit::method("g", "m", || Ok(()))];
        let err = Harness::new(config)
            .with_unit_logging(false)
            .run(units)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to save"));
        assert!(err.root_cause().downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_extra_listener_sees_every_unit() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default().with_result_file(dir.path().join("out.json"));
        let collector = Arc::new(ResultCollector::new());

        let units = vec![TestUnit::group(
            "g",
            vec![
                TestUnit::method("g", "a", || Ok(())),
                TestUnit::method("g", "b", || Ok(())),
            ],
        )];
        let result = tokio_test::block_on(
            Harness::new(config)
                .with_unit_logging(false)
                .with_listener(collector.clone())
                .run(units),
        )
        .unwrap();

        assert_eq!(collector.snapshot(), result.raw);
        assert_eq!(result.raw.len(), 3);
        assert_eq!(result.set.succeeded().len(), 2);
    }

    #[test]
    fn test_summary_uses_identity_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("author.name"), "student\n").unwrap();

        let mut config = AppConfig::default();
        config.author_file = dir.path().join("author.name");
        config.owner_file = dir.path().join("owner.name");
        let harness = Harness::new(config);

        let set = AggregatedSet::new(vec![crate::results::AggregatedDatum::new(
            "g",
            "m",
            Default::default(),
            vec![crate::models::Outcome::succeeded()],
        )]);
        let rows = harness.summary(&set);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "student");
        assert_eq!(rows[0].owner, "None");
        assert_eq!(rows[0].succeeded("No tag"), Some(1));
    }
}
