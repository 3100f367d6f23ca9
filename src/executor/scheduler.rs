//! Leaf unit scheduling
//!
//! Runs one leaf body on a [`TimeLimiter`] and turns whatever happens into an
//! [`Outcome`]: a normal return, a [`UnitError`], a panic, an intercepted
//! exit request, or the deadline passing first.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, warn};

use super::exit::ExitRequest;
use super::limiter::{LimitError, TimeLimiter, WorkerPool};
use crate::models::{OpaqueFailure, Outcome, UnitBody, UnitError, PANIC_TYPE};

/// Type name recorded when the limiter itself fails
pub const WORKER_ERROR_TYPE: &str = "WorkerError";

/// Executes leaf units under the configured timeout
pub struct Scheduler<L = WorkerPool> {
    limiter: L,
    timeout: Option<Duration>,
}

impl Scheduler<WorkerPool> {
    /// Scheduler backed by a fresh worker pool
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_limiter(WorkerPool::new(), timeout)
    }
}

impl<L: TimeLimiter> Scheduler<L> {
    pub fn with_limiter(limiter: L, timeout: Option<Duration>) -> Self {
        Self { limiter, timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn limiter(&self) -> &L {
        &self.limiter
    }

    /// Run one leaf body and classify the result
    ///
    /// Returns `TimedOut` as soon as the timeout passes. The body is not
    /// stopped and may keep running in the background.
    pub async fn submit(&self, body: UnitBody) -> Outcome {
        match self
            .limiter
            .call_with_timeout(move || run_guarded(body), self.timeout)
            .await
        {
            Ok(outcome) => outcome,
            Err(LimitError::TimedOut(limit)) => {
                debug!("Unit exceeded its {:?} limit", limit);
                Outcome::timed_out(limit)
            }
            Err(e) => {
                warn!("Unit could not be executed: {}", e);
                Outcome::failed(OpaqueFailure::new(WORKER_ERROR_TYPE, e.to_string()))
            }
        }
    }
}

/// Run a body on the current thread, catching panics
pub fn run_guarded(body: UnitBody) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => Outcome::succeeded(),
        Ok(Err(err)) => Outcome::from(err),
        Err(payload) => outcome_from_panic(payload),
    }
}

fn outcome_from_panic(payload: Box<dyn Any + Send>) -> Outcome {
    if let Some(request) = payload.downcast_ref::<ExitRequest>() {
        return Outcome::exit_attempted(request.code);
    }

    let payload = match payload.downcast::<UnitError>() {
        Ok(err) => return Outcome::from(*err),
        Err(payload) => payload,
    };

    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    Outcome::failed(OpaqueFailure::new(PANIC_TYPE, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpectedActualFailure, FailureDetail, Status, TIMEOUT_TYPE};
    use std::thread;
    use std::time::Instant;

    fn body<F>(f: F) -> UnitBody
    where
        F: FnOnce() -> Result<(), UnitError> + Send + 'static,
    {
        Box::new(f)
    }

    #[tokio::test]
    async fn test_success() {
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let outcome = scheduler.submit(body(|| Ok(()))).await;
        assert_eq!(outcome, Outcome::succeeded());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));

        let outcome = scheduler
            .submit(body(|| Err(UnitError::message("io::Error", "disk full"))))
            .await;
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(
            outcome.failure,
            Some(FailureDetail::Opaque(OpaqueFailure::new(
                "io::Error",
                "disk full"
            )))
        );

        let outcome = scheduler
            .submit(body(|| Err(UnitError::skipped("precondition"))))
            .await;
        assert_eq!(outcome.status, Status::Aborted);

        let outcome = scheduler
            .submit(body(|| Err(UnitError::not_implemented("todo"))))
            .await;
        assert_eq!(outcome.status, Status::NotImplemented);

        let outcome = scheduler
            .submit(body(|| {
                Err(UnitError::mismatch(
                    ExpectedActualFailure::new(3, 4).with_input("n", 2),
                ))
            }))
            .await;
        assert_eq!(outcome.status, Status::Failed);
        assert!(matches!(
            outcome.failure,
            Some(FailureDetail::ExpectedActual(_))
        ));
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let outcome = scheduler.submit(body(|| panic!("boom"))).await;
        assert_eq!(
            outcome,
            Outcome::failed(OpaqueFailure::new(PANIC_TYPE, "boom"))
        );

        let outcome = scheduler
            .submit(body(|| panic!("formatted {}", 7)))
            .await;
        assert_eq!(
            outcome,
            Outcome::failed(OpaqueFailure::new(PANIC_TYPE, "formatted 7"))
        );
    }

    #[tokio::test]
    async fn test_unit_error_panic_payload() {
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let outcome = scheduler
            .submit(body(|| panic::panic_any(UnitError::skipped("from deep inside"))))
            .await;
        assert_eq!(outcome.status, Status::Aborted);
    }

    #[tokio::test]
    async fn test_timeout_of_one_second() {
        let scheduler = Scheduler::new(Some(Duration::from_secs(1)));
        let start = Instant::now();
        let outcome = scheduler
            .submit(body(|| loop {
                thread::sleep(Duration::from_millis(100));
            }))
            .await;
        let elapsed = start.elapsed();

        assert_eq!(outcome.status, Status::TimedOut);
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(3));

        let failure = outcome.failure.unwrap();
        assert_eq!(failure.opaque_type(), Some(TIMEOUT_TYPE));
        assert!(failure.message().contains('1'));
    }

    #[tokio::test]
    async fn test_without_timeout_waits_for_completion() {
        let scheduler = Scheduler::new(None);
        let outcome = scheduler
            .submit(body(|| {
                thread::sleep(Duration::from_millis(50));
                Ok(())
            }))
            .await;
        assert!(outcome.is_success());
    }

    #[test]
    fn test_run_guarded_inline() {
        let outcome = run_guarded(body(|| Err(UnitError::skipped("inline"))));
        assert_eq!(outcome.status, Status::Aborted);
    }
}
