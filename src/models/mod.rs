//! Data models for the harness
//!
//! This module contains all data structures used throughout the application.

mod outcome;
mod unit;
mod value;

pub use outcome::{
    truncate_message, ExpectedActualFailure, FailureDetail, OpaqueFailure, Outcome, Status,
    EXIT_ATTEMPT_TYPE, MAX_MESSAGE_LEN, NOT_IMPLEMENTED_TYPE, PANIC_TYPE, SKIPPED_TYPE,
    TIMEOUT_TYPE,
};
pub use unit::{
    check_eq, MethodSource, TestUnit, UnitBody, UnitError, UnitId, UnitInfo, UnitKind, UnitType,
};
pub use value::{ErrorValue, Value, ValueKind};
