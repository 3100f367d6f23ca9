//! Test unit models
//!
//! A test unit is either a leaf (an executable body) or a group of units.
//! Units are produced by discovery, outside this crate.

use std::collections::BTreeSet;
use std::fmt;

use super::outcome::{ExpectedActualFailure, OpaqueFailure, Outcome};
use super::value::Value;

/// Stable identity of a unit
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a unit comes from: its group (e.g. a test class) and method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodSource {
    pub group: String,
    pub method: String,
}

impl MethodSource {
    pub fn new(group: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            method: method.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitType {
    Leaf,
    Group,
}

/// Identity half of a unit, kept after the body has been executed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    pub id: UnitId,
    pub unit_type: UnitType,
    pub tags: BTreeSet<String>,
    pub source: Option<MethodSource>,
}

impl UnitInfo {
    pub fn new(id: impl Into<UnitId>, unit_type: UnitType) -> Self {
        Self {
            id: id.into(),
            unit_type,
            tags: BTreeSet::new(),
            source: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.unit_type == UnitType::Leaf
    }
}

/// Body of a leaf unit
pub type UnitBody = Box<dyn FnOnce() -> Result<(), UnitError> + Send + 'static>;

pub enum UnitKind {
    Leaf(UnitBody),
    Group(Vec<TestUnit>),
}

/// Executable test unit
pub struct TestUnit {
    pub info: UnitInfo,
    pub kind: UnitKind,
}

impl TestUnit {
    /// Leaf unit without source metadata
    pub fn leaf<F>(id: impl Into<UnitId>, body: F) -> Self
    where
        F: FnOnce() -> Result<(), UnitError> + Send + 'static,
    {
        Self {
            info: UnitInfo::new(id, UnitType::Leaf),
            kind: UnitKind::Leaf(Box::new(body)),
        }
    }

    pub fn group(id: impl Into<UnitId>, children: Vec<TestUnit>) -> Self {
        Self {
            info: UnitInfo::new(id, UnitType::Group),
            kind: UnitKind::Group(children),
        }
    }

    /// Leaf unit for `group::method`
    pub fn method<F>(group: &str, method: &str, body: F) -> Self
    where
        F: FnOnce() -> Result<(), UnitError> + Send + 'static,
    {
        Self::leaf(format!("{group}::{method}"), body).with_source(group, method)
    }

    /// One invocation of a data-driven or repeated method
    pub fn invocation<F>(group: &str, method: &str, index: usize, body: F) -> Self
    where
        F: FnOnce() -> Result<(), UnitError> + Send + 'static,
    {
        Self::leaf(format!("{group}::{method}[{index}]"), body).with_source(group, method)
    }

    pub fn with_source(mut self, group: impl Into<String>, method: impl Into<String>) -> Self {
        self.info.source = Some(MethodSource::new(group, method));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.info.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &UnitId {
        &self.info.id
    }

    /// Number of leaves in this unit tree
    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            UnitKind::Leaf(_) => 1,
            UnitKind::Group(children) => children.iter().map(TestUnit::leaf_count).sum(),
        }
    }
}

impl fmt::Debug for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TestUnit");
        s.field("info", &self.info);
        match &self.kind {
            UnitKind::Leaf(_) => s.field("kind", &"leaf"),
            UnitKind::Group(children) => s.field("children", children),
        };
        s.finish()
    }
}

/// Error raised by a leaf body
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    /// The unit decided not to run
    #[error("skipped: {0}")]
    Skipped(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Wrong answer for a known input
    #[error("expected {} but was {}", .0.expected_output, .0.output)]
    Mismatch(Box<ExpectedActualFailure>),

    #[error("{type_name} : {message}")]
    Failed { type_name: String, message: String },
}

impl UnitError {
    pub fn skipped(reason: impl Into<String>) -> Self {
        UnitError::Skipped(reason.into())
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        UnitError::NotImplemented(what.into())
    }

    pub fn mismatch(failure: ExpectedActualFailure) -> Self {
        UnitError::Mismatch(Box::new(failure))
    }

    /// Wrap any error, keeping its type name
    pub fn failed<E: std::error::Error + 'static>(err: E) -> Self {
        UnitError::Failed {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
        }
    }

    pub fn message(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        UnitError::Failed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for UnitError {
    fn from(err: anyhow::Error) -> Self {
        UnitError::Failed {
            type_name: "anyhow::Error".to_string(),
            message: format!("{err:#}"),
        }
    }
}

impl From<UnitError> for Outcome {
    fn from(err: UnitError) -> Self {
        match err {
            UnitError::Skipped(reason) => Outcome::aborted(reason),
            UnitError::NotImplemented(what) => Outcome::not_implemented(what),
            UnitError::Mismatch(failure) => Outcome::failed(*failure),
            UnitError::Failed { type_name, message } => {
                Outcome::failed(OpaqueFailure::new(type_name, message))
            }
        }
    }
}

/// Compare an actual result with the expected one for the given input
pub fn check_eq<I, K, V>(
    input: I,
    actual: impl Into<Value>,
    expected: impl Into<Value>,
) -> Result<(), UnitError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let actual = actual.into();
    let expected = expected.into();
    if actual == expected {
        return Ok(());
    }

    let mut failure = ExpectedActualFailure::new(actual, expected);
    failure.input = input
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Err(UnitError::mismatch(failure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{FailureDetail, Status, SKIPPED_TYPE};

    #[test]
    fn test_method_unit_has_source() {
        let unit = TestUnit::method("pkg.A", "m", || Ok(())).with_tag("Easy");
        assert_eq!(unit.id().as_str(), "pkg.A::m");
        assert_eq!(unit.info.source, Some(MethodSource::new("pkg.A", "m")));
        assert!(unit.info.tags.contains("Easy"));
        assert!(unit.info.is_leaf());
    }

    #[test]
    fn test_invocations_have_distinct_ids() {
        let first = TestUnit::invocation("pkg.A", "m", 1, || Ok(()));
        let second = TestUnit::invocation("pkg.A", "m", 2, || Ok(()));
        assert_ne!(first.id(), second.id());
        assert_eq!(first.info.source, second.info.source);
    }

    #[test]
    fn test_leaf_count() {
        let unit = TestUnit::group(
            "root",
            vec![
                TestUnit::leaf("a", || Ok(())),
                TestUnit::group("inner", vec![TestUnit::leaf("b", || Ok(()))]),
            ],
        );
        assert_eq!(unit.leaf_count(), 2);
        assert!(!unit.info.is_leaf());
    }

    #[test]
    fn test_unit_error_to_outcome() {
        let outcome = Outcome::from(UnitError::skipped("not today"));
        assert_eq!(outcome.status, Status::Aborted);
        assert_eq!(
            outcome.failure.as_ref().and_then(FailureDetail::opaque_type),
            Some(SKIPPED_TYPE)
        );

        let outcome = Outcome::from(UnitError::not_implemented("sort"));
        assert_eq!(outcome.status, Status::NotImplemented);

        let err = "x".parse::<u8>().unwrap_err();
        let outcome = Outcome::from(UnitError::failed(err));
        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome
            .failure
            .unwrap()
            .opaque_type()
            .unwrap()
            .ends_with("ParseIntError"));
    }

    #[test]
    fn test_check_eq() {
        assert!(check_eq([("n", 2)], 4, 4).is_ok());

        let err = check_eq([("n", 2)], 3, 4).unwrap_err();
        match err {
            UnitError::Mismatch(failure) => {
                assert_eq!(failure.input, vec![("n".to_string(), Value::Int(2))]);
                assert_eq!(failure.output, Value::Int(3));
                assert_eq!(failure.expected_output, Value::Int(4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: UnitError = anyhow::anyhow!("boom").context("while sorting").into();
        assert_eq!(err.to_string(), "anyhow::Error : while sorting: boom");
    }
}
