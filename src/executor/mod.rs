//! Test execution engine
//!
//! Time-limited leaf execution, exit interception and the pass runner.

mod exit;
mod limiter;
mod listener;
mod runner;
mod scheduler;

pub use exit::{current_policy, request_exit, ExitGuard, ExitPolicy, ExitRequest};
pub use limiter::{LimitError, TimeLimiter, WorkerPool, DEFAULT_KEEP_ALIVE, WORKER_NAME_PREFIX};
pub use listener::{ExecutionListener, LogListener};
pub use runner::Runner;
pub use scheduler::{run_guarded, Scheduler, WORKER_ERROR_TYPE};
