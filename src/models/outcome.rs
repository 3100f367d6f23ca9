//! Outcome models
//!
//! Defines the terminal classification of one execution attempt and the
//! failure payloads attached to it.

use std::fmt;
use std::time::Duration;

use super::value::Value;

/// Maximum length (in characters) of any free-text message
pub const MAX_MESSAGE_LEN: usize = 8096;

/// Type name of the failure recorded for a timed-out unit
pub const TIMEOUT_TYPE: &str = "Timeout";

/// Type name of the failure recorded when a unit tried to exit the process
pub const EXIT_ATTEMPT_TYPE: &str = "ExitAttempt";

/// Type name of the failure recorded for a panicking unit
pub const PANIC_TYPE: &str = "Panic";

/// Type name of the failure recorded for an intentionally skipped unit
pub const SKIPPED_TYPE: &str = "Skipped";

/// Type name of the failure recorded for an unimplemented unit
pub const NOT_IMPLEMENTED_TYPE: &str = "NotImplemented";

/// Execution status of a unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Succeeded,
    Aborted,
    Failed,
    TimedOut,
    NotImplemented,
}

impl Status {
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Succeeded => "✓",
            Status::Aborted => "○",
            Status::Failed => "✗",
            Status::TimedOut => "⧗",
            Status::NotImplemented => "?",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Succeeded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Succeeded => write!(f, "SUCCEEDED"),
            Status::Aborted => write!(f, "ABORTED"),
            Status::Failed => write!(f, "FAILED"),
            Status::TimedOut => write!(f, "TIMED OUT"),
            Status::NotImplemented => write!(f, "NOT IMPLEMENTED"),
        }
    }
}

/// Failure where the unit produced a wrong answer for a known input
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedActualFailure {
    pub input: Vec<(String, Value)>,
    pub output: Value,
    pub expected_output: Value,
    /// Text of the underlying cause, if any
    pub cause: Option<String>,
}

impl ExpectedActualFailure {
    pub fn new(output: impl Into<Value>, expected_output: impl Into<Value>) -> Self {
        Self {
            input: Vec::new(),
            output: output.into(),
            expected_output: expected_output.into(),
            cause: None,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.push((key.into(), value.into()));
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(truncate_message(&cause.into()));
        self
    }
}

/// Failure whose originating error falls outside the known payload shapes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueFailure {
    pub type_name: String,
    pub message: String,
}

impl OpaqueFailure {
    pub fn new(type_name: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self {
            type_name: type_name.into(),
            message: truncate_message(message.as_ref()),
        }
    }
}

impl fmt::Display for OpaqueFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.type_name, self.message)
    }
}

/// Failure payload attached to an outcome
#[derive(Clone, Debug, PartialEq)]
pub enum FailureDetail {
    ExpectedActual(ExpectedActualFailure),
    Opaque(OpaqueFailure),
}

impl FailureDetail {
    /// Short human-readable description
    pub fn message(&self) -> String {
        match self {
            FailureDetail::ExpectedActual(f) => {
                format!("expected {} but was {}", f.expected_output, f.output)
            }
            FailureDetail::Opaque(f) => f.to_string(),
        }
    }

    pub fn opaque_type(&self) -> Option<&str> {
        match self {
            FailureDetail::Opaque(f) => Some(&f.type_name),
            FailureDetail::ExpectedActual(_) => None,
        }
    }
}

impl From<ExpectedActualFailure> for FailureDetail {
    fn from(f: ExpectedActualFailure) -> Self {
        FailureDetail::ExpectedActual(f)
    }
}

impl From<OpaqueFailure> for FailureDetail {
    fn from(f: OpaqueFailure) -> Self {
        FailureDetail::Opaque(f)
    }
}

/// Terminal classification of one execution attempt
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub failure: Option<FailureDetail>,
}

impl Outcome {
    pub fn new(status: Status, failure: Option<FailureDetail>) -> Self {
        Self { status, failure }
    }

    pub fn succeeded() -> Self {
        Self::new(Status::Succeeded, None)
    }

    pub fn failed(failure: impl Into<FailureDetail>) -> Self {
        Self::new(Status::Failed, Some(failure.into()))
    }

    pub fn aborted(reason: impl AsRef<str>) -> Self {
        Self::new(
            Status::Aborted,
            Some(OpaqueFailure::new(SKIPPED_TYPE, reason).into()),
        )
    }

    pub fn not_implemented(what: impl AsRef<str>) -> Self {
        Self::new(
            Status::NotImplemented,
            Some(OpaqueFailure::new(NOT_IMPLEMENTED_TYPE, what).into()),
        )
    }

    /// Outcome of a unit that did not finish within `limit`
    pub fn timed_out(limit: Duration) -> Self {
        Self::new(
            Status::TimedOut,
            Some(
                OpaqueFailure::new(TIMEOUT_TYPE, format!("execution timed out after {limit:?}"))
                    .into(),
            ),
        )
    }

    /// Outcome of a unit that asked the host process to exit
    pub fn exit_attempted(code: i32) -> Self {
        Self::failed(OpaqueFailure::new(
            EXIT_ATTEMPT_TYPE,
            format!("exit attempted with code {code}"),
        ))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_timed_out(&self) -> bool {
        self.status == Status::TimedOut
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.symbol(), self.status)?;
        if let Some(failure) = &self.failure {
            write!(f, " - {}", failure.message())?;
        }
        Ok(())
    }
}

/// Cut a message down to [`MAX_MESSAGE_LEN`] characters
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_mentions_limit() {
        let outcome = Outcome::timed_out(Duration::from_secs(1));
        assert!(outcome.is_timed_out());
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.opaque_type(), Some(TIMEOUT_TYPE));
        assert!(failure.message().contains("1s"));
    }

    #[test]
    fn test_exit_attempted_is_failure() {
        let outcome = Outcome::exit_attempted(42);
        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome.failure.unwrap().message().contains("42"));
    }

    #[test]
    fn test_marker_failure_types() {
        let aborted = Outcome::aborted("flaky");
        assert_eq!(aborted.status, Status::Aborted);
        assert_eq!(
            aborted.failure.as_ref().and_then(FailureDetail::opaque_type),
            Some(SKIPPED_TYPE)
        );

        let todo = Outcome::not_implemented("sum");
        assert_eq!(todo.status, Status::NotImplemented);
        assert_eq!(
            todo.failure.as_ref().and_then(FailureDetail::opaque_type),
            Some(NOT_IMPLEMENTED_TYPE)
        );
    }

    #[test]
    fn test_truncate_message() {
        let long = "é".repeat(MAX_MESSAGE_LEN + 10);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN);
        assert_eq!(truncate_message("short"), "short");
    }

    #[test]
    fn test_expected_actual_message() {
        let failure: FailureDetail = ExpectedActualFailure::new(3, 4).with_input("n", 2).into();
        assert_eq!(failure.message(), "expected 4 but was 3");
        assert_eq!(failure.opaque_type(), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Succeeded.to_string(), "SUCCEEDED");
        assert_eq!(Status::TimedOut.to_string(), "TIMED OUT");
        assert!(Status::Succeeded.is_success());
        assert!(!Status::Aborted.is_success());
    }
}
