//! Execution event listeners

use tracing::{debug, info, warn};

use crate::models::{Outcome, Status, UnitInfo};

/// Receives events while a pass executes
pub trait ExecutionListener: Send + Sync {
    fn execution_started(&self, _unit: &UnitInfo) {}

    fn execution_finished(&self, unit: &UnitInfo, outcome: &Outcome);
}

/// Reports every finished leaf through the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogListener;

impl ExecutionListener for LogListener {
    fn execution_started(&self, unit: &UnitInfo) {
        debug!("Running {}", unit.id);
    }

    fn execution_finished(&self, unit: &UnitInfo, outcome: &Outcome) {
        if !unit.is_leaf() {
            return;
        }
        match outcome.status {
            Status::Succeeded => info!("  {} {}", outcome.status.symbol(), unit.id),
            _ => warn!("  {} {}: {}", outcome.status.symbol(), unit.id, outcome),
        }
    }
}
