//! Process-exit interception
//!
//! Units must not be able to end the whole pass by exiting the process. Unit
//! code asks for an exit through [`request_exit`]. While an [`ExitGuard`] is
//! alive that request unwinds the unit's worker with an [`ExitRequest`]
//! payload, which the scheduler records as a failure. Without a guard the
//! process exits as usual.
//!
//! The policy is process-wide. Installing a guard also takes the pass lock,
//! so at most one pass runs with interception at a time, and dropping the
//! guard (including while unwinding) restores the previous policy.

use std::sync::{Arc, Mutex, Once, OnceLock, PoisonError};
use std::thread;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use super::limiter::WORKER_NAME_PREFIX;

/// What happens when a unit asks the process to exit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Exit the process
    Terminate,
    /// Unwind the calling unit instead
    Intercept,
}

/// Panic payload raised by an intercepted exit request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitRequest {
    pub code: i32,
}

static POLICY: Mutex<ExitPolicy> = Mutex::new(ExitPolicy::Terminate);
static PASS_LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
static PANIC_HOOK: Once = Once::new();

/// Currently active exit policy
pub fn current_policy() -> ExitPolicy {
    *POLICY.lock().unwrap_or_else(PoisonError::into_inner)
}

fn swap_policy(policy: ExitPolicy) -> ExitPolicy {
    let mut current = POLICY.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *current, policy)
}

pub(crate) fn pass_lock() -> Arc<AsyncMutex<()>> {
    Arc::clone(PASS_LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))))
}

/// Exit the process, or unwind the current unit if exits are intercepted
pub fn request_exit(code: i32) -> ! {
    if current_policy() == ExitPolicy::Intercept {
        std::panic::panic_any(ExitRequest { code });
    }
    std::process::exit(code)
}

/// Keep intercepted exits and unit panics off stderr while a pass runs.
///
/// Installed once per process; it consults the current policy on every
/// panic and hands everything else to the hook that was there before.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let on_worker = thread::current()
                .name()
                .is_some_and(|name| name.starts_with(WORKER_NAME_PREFIX));

            if on_worker && current_policy() == ExitPolicy::Intercept {
                if let Some(request) = info.payload().downcast_ref::<ExitRequest>() {
                    debug!("Intercepted exit request with code {}", request.code);
                } else {
                    debug!("Unit panicked: {}", info);
                }
                return;
            }
            previous(info)
        }));
    });
}

/// Scoped exit interception for one pass
///
/// Restores the previous policy and releases the pass lock when dropped.
#[must_use = "exit interception ends when the guard is dropped"]
pub struct ExitGuard {
    previous: ExitPolicy,
    _pass: OwnedMutexGuard<()>,
}

impl ExitGuard {
    /// Wait for any other pass to finish, then intercept exits
    pub async fn install() -> Self {
        let pass = pass_lock().lock_owned().await;
        install_panic_hook();
        let previous = swap_policy(ExitPolicy::Intercept);
        debug!("Exit interception installed (previous: {:?})", previous);

        Self {
            previous,
            _pass: pass,
        }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        swap_policy(self.previous);
        debug!("Exit interception removed");
    }
}
