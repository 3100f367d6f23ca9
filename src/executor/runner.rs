//! Test pass runner
//!
//! Walks unit trees, sends every leaf through the [`Scheduler`] and reports
//! each unit's outcome to the registered listeners. Groups are never time
//! bounded themselves; each of their leaves is, at any depth.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::exit::ExitGuard;
use super::limiter::{TimeLimiter, WorkerPool};
use super::listener::ExecutionListener;
use super::scheduler::Scheduler;
use crate::models::{Outcome, TestUnit, UnitKind};
use crate::utils::Timer;

/// Runner for one or more passes over a suite
pub struct Runner<L = WorkerPool> {
    scheduler: Arc<Scheduler<L>>,
    listeners: Vec<Arc<dyn ExecutionListener>>,
    max_concurrent: usize,
}

impl<L: TimeLimiter + 'static> Runner<L> {
    pub fn new(scheduler: Scheduler<L>) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            listeners: Vec::new(),
            max_concurrent: 1,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Run up to `n` top-level units at once
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn scheduler(&self) -> &Scheduler<L> {
        &self.scheduler
    }

    /// Run a whole pass
    ///
    /// Exit requests from units are intercepted for the duration of the
    /// pass. Returns the outcomes of the top-level units in input order.
    pub async fn run(&self, units: Vec<TestUnit>) -> Vec<Outcome> {
        let _guard = ExitGuard::install().await;
        let leaves: usize = units.iter().map(TestUnit::leaf_count).sum();
        let timer = Timer::start("pass");

        info!(
            "Starting pass: {} units, {} leaves (timeout {:?}, max {} concurrent)",
            units.len(),
            leaves,
            self.scheduler.timeout(),
            self.max_concurrent
        );

        let outcomes = if self.max_concurrent > 1 {
            self.run_concurrent(units).await
        } else {
            let mut outcomes = Vec::with_capacity(units.len());
            for unit in units {
                outcomes.push(execute_unit(&self.scheduler, &self.listeners, unit).await);
            }
            outcomes
        };

        info!("Pass completed in {}ms", timer.elapsed_ms());
        outcomes
    }

    async fn run_concurrent(&self, units: Vec<TestUnit>) -> Vec<Outcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let listeners: Arc<[Arc<dyn ExecutionListener>]> = self.listeners.clone().into();
        let mut handles = Vec::with_capacity(units.len());

        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            let scheduler = Arc::clone(&self.scheduler);
            let listeners = Arc::clone(&listeners);

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                execute_unit(&scheduler, &listeners, unit).await
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Unit task failed: {}", e);
                    Outcome::failed(crate::models::OpaqueFailure::new(
                        super::scheduler::WORKER_ERROR_TYPE,
                        e.to_string(),
                    ))
                }
            })
            .collect()
    }
}

fn execute_unit<'a, L: TimeLimiter>(
    scheduler: &'a Scheduler<L>,
    listeners: &'a [Arc<dyn ExecutionListener>],
    unit: TestUnit,
) -> BoxFuture<'a, Outcome> {
    async move {
        let TestUnit { info, kind } = unit;
        for listener in listeners {
            listener.execution_started(&info);
        }

        let outcome = match kind {
            UnitKind::Leaf(body) => scheduler.submit(body).await,
            UnitKind::Group(children) => {
                for child in children {
                    execute_unit(scheduler, listeners, child).await;
                }
                Outcome::succeeded()
            }
        };

        for listener in listeners {
            listener.execution_finished(&info, &outcome);
        }
        outcome
    }
    .boxed()
}
