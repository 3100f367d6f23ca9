//! Timer utilities
//!
//! Wall-clock measurement for passes and harness phases.

use std::fmt;
use std::time::{Duration, Instant};

/// Labelled timer started on creation
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Log the elapsed time and return it
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{} took {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}ms", self.label, self.elapsed_ms())
    }
}
