//! unitgrade - time-limited unit test execution with graded result documents
//!
//! Runs a tree of test units with a per-unit timeout, intercepts attempts to
//! terminate the process, collects one outcome per leaf and rolls them up per
//! test method into a JSON result document that can be reloaded for
//! re-analysis.
//!
//! ## Usage
//!
//! ```no_run
//! use unitgrade::{AppConfig, Harness, TestUnit};
//!
//! # async fn pass() -> anyhow::Result<()> {
//! let units = vec![TestUnit::group(
//!     "pkg.Sorting",
//!     vec![TestUnit::method("pkg.Sorting", "empty", || Ok(())).with_tag("Easy")],
//! )];
//! let result = Harness::new(AppConfig::resolve(None)?).run(units).await?;
//! println!("{} methods passed", result.set.succeeded().len());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod executor;
pub mod harness;
pub mod models;
pub mod output;
pub mod results;
pub mod utils;

pub use config::AppConfig;
pub use executor::{request_exit, ExecutionListener, Runner, Scheduler};
pub use harness::{Harness, PassResult};
pub use models::{check_eq, Outcome, Status, TestUnit, UnitError, Value};
pub use results::{AggregatedDatum, AggregatedSet, RawResultMap, ResultCollector, ResultsStorage};
