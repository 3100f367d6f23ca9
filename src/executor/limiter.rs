//! Time-limited execution on background workers
//!
//! [`TimeLimiter`] is the one seam the scheduler depends on: run a task
//! somewhere else and wait for it at most a given duration. The default
//! implementation is a cached pool of plain OS threads. Those threads never
//! keep the process alive, so a unit that is still spinning after its
//! deadline cannot block shutdown.
//!
//! A timeout only stops the caller from waiting. The task itself keeps
//! running on its worker until it returns on its own.

use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Thread name prefix of pool workers
pub const WORKER_NAME_PREFIX: &str = "unitgrade-worker";

/// How long an idle worker waits for new work before exiting
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Errors returned by a [`TimeLimiter`]
#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),

    #[error("worker stopped before reporting a result")]
    WorkerLost,

    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Executes a task with an optional wall-clock bound
pub trait TimeLimiter: Send + Sync {
    /// Start `task` and wait for its result for at most `timeout`.
    ///
    /// The task is handed to a worker before this returns; the returned
    /// future only waits. `None` waits without a bound.
    fn call_with_timeout<T, F>(
        &self,
        task: F,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<T, LimitError>> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolShared {
    sender: Sender<Job>,
    receiver: Mutex<Receiver<Job>>,
    /// Workers waiting for a job that nobody has claimed yet
    idle: AtomicUsize,
    spawned: AtomicUsize,
    keep_alive: Duration,
}

/// Cached pool of background worker threads
///
/// Idle workers are reused. When none is idle (for example because earlier
/// workers are stuck in timed-out units) a new worker is started.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::with_keep_alive(DEFAULT_KEEP_ALIVE)
    }

    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            shared: Arc::new(PoolShared {
                sender,
                receiver: Mutex::new(receiver),
                idle: AtomicUsize::new(0),
                spawned: AtomicUsize::new(0),
                keep_alive,
            }),
        }
    }

    /// Number of threads started by this pool so far
    pub fn spawned(&self) -> usize {
        self.shared.spawned.load(Ordering::Acquire)
    }

    /// Number of workers currently waiting for work
    pub fn idle(&self) -> usize {
        self.shared.idle.load(Ordering::Acquire)
    }

    /// Hand a job to an idle worker, or start a new one
    fn execute(&self, job: Job) -> io::Result<()> {
        let claimed = self
            .shared
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();

        if claimed {
            // The pool owns the receiver, so the channel cannot be disconnected.
            if let Err(mpsc::SendError(job)) = self.shared.sender.send(job) {
                return self.spawn_worker(job);
            }
            Ok(())
        } else {
            self.spawn_worker(job)
        }
    }

    fn spawn_worker(&self, first: Job) -> io::Result<()> {
        let n = self.shared.spawned.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = Arc::clone(&self.shared);

        thread::Builder::new()
            .name(format!("{WORKER_NAME_PREFIX}-{n}"))
            .spawn(move || worker_loop(shared, first))?;

        debug!("Started worker thread {}", n);
        Ok(())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(shared: Arc<PoolShared>, first: Job) {
    let mut next = Some(first);

    loop {
        if let Some(job) = next.take() {
            // Jobs from the scheduler never unwind; this keeps the worker alive
            // for any other caller of the pool.
            let _ = panic::catch_unwind(AssertUnwindSafe(job));
            shared.idle.fetch_add(1, Ordering::AcqRel);
        }

        let received = {
            let receiver = shared.receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv_timeout(shared.keep_alive)
        };

        match received {
            Ok(job) => next = Some(job),
            Err(RecvTimeoutError::Timeout) => {
                // Leave only if no job has been promised to the idle set.
                let retired = shared
                    .idle
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_ok();
                if retired {
                    trace!("Idle worker exiting");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

impl TimeLimiter for WorkerPool {
    fn call_with_timeout<T, F>(
        &self,
        task: F,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<T, LimitError>> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let started = self.execute(Box::new(move || {
            // The receiver is gone if the caller already gave up.
            let _ = tx.send(task());
        }));

        async move {
            started?;
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, rx).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(_)) => Err(LimitError::WorkerLost),
                    Err(_) => Err(LimitError::TimedOut(limit)),
                },
                None => rx.await.map_err(|_| LimitError::WorkerLost),
            }
        }
    }
}
