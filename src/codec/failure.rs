//! Failure payload encoding
//!
//! Failures are a tagged union keyed by `"@class"`. Expected/actual failures
//! carry the type name of their output and expected output so both can be
//! rebuilt with their exact kind.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::{Deserialize, Deserializer};
use serde_json::Value as Json;
use tracing::warn;

use super::value::{decode_input, decode_typed, encode_input, encode_value};
use crate::models::{
    truncate_message, ErrorValue, ExpectedActualFailure, FailureDetail, OpaqueFailure,
};

pub const CLASS_KEY: &str = "@class";
pub const EXPECTED_ACTUAL_CLASS: &str = "ExpectedActualFailure";
pub const OPAQUE_CLASS: &str = "OpaqueFailure";
/// Wrapper class marking the failure of a timed-out unit
pub const TIMEOUT_CLASS: &str = "TimeoutFailure";

const SEPARATOR: &str = " : ";
const DETAIL_KEY: &str = "detail";

/// Wire form of an outcome's failure
///
/// A timeout wraps whatever failure the unit carried, so a user failure
/// that merely names itself `Timeout` is never read back as one.
#[derive(Clone, Debug, PartialEq)]
pub enum FailureDatum {
    Detail(FailureDetail),
    Timeout(Option<FailureDetail>),
}

impl FailureDatum {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureDatum::Timeout(_))
    }

    pub fn into_detail(self) -> Option<FailureDetail> {
        match self {
            FailureDatum::Detail(detail) => Some(detail),
            FailureDatum::Timeout(detail) => detail,
        }
    }
}

impl From<FailureDetail> for FailureDatum {
    fn from(detail: FailureDetail) -> Self {
        FailureDatum::Detail(detail)
    }
}

struct DetailRef<'a>(&'a FailureDetail);

impl Serialize for DetailRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            FailureDetail::ExpectedActual(f) => {
                let mut map = serializer.serialize_map(Some(7))?;
                map.serialize_entry(CLASS_KEY, EXPECTED_ACTUAL_CLASS)?;
                map.serialize_entry("input", &encode_input(&f.input))?;
                map.serialize_entry("@outputClass", f.output.type_name())?;
                map.serialize_entry("output", &encode_value(&f.output))?;
                map.serialize_entry("@expectedOutputClass", f.expected_output.type_name())?;
                map.serialize_entry("expectedOutput", &encode_value(&f.expected_output))?;
                map.serialize_entry(
                    "nestedException",
                    &f.cause.as_deref().map(truncate_message),
                )?;
                map.end()
            }
            FailureDetail::Opaque(f) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(CLASS_KEY, OPAQUE_CLASS)?;
                map.serialize_entry("nestedException", &nested_exception(f))?;
                map.end()
            }
        }
    }
}

impl Serialize for FailureDatum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FailureDatum::Detail(detail) => DetailRef(detail).serialize(serializer),
            FailureDatum::Timeout(detail) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry(CLASS_KEY, TIMEOUT_CLASS)?;
                if let Some(detail) = detail {
                    map.serialize_entry(DETAIL_KEY, &DetailRef(detail))?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FailureDatum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Ok(decode_datum(&json))
    }
}

/// Decode a failure as written next to an outcome, timeouts included
pub fn decode_datum(json: &Json) -> FailureDatum {
    let is_timeout = json.get(CLASS_KEY).and_then(Json::as_str) == Some(TIMEOUT_CLASS);
    if !is_timeout {
        return FailureDatum::Detail(decode_failure(json));
    }
    FailureDatum::Timeout(
        json.get(DETAIL_KEY)
            .filter(|detail| !detail.is_null())
            .map(decode_failure),
    )
}

/// `"<type> : <message>"`, truncated
fn nested_exception(f: &OpaqueFailure) -> String {
    truncate_message(&f.to_string())
}

fn parse_nested_exception(text: &str) -> OpaqueFailure {
    match text.split_once(SEPARATOR) {
        Some((type_name, message)) => OpaqueFailure::new(type_name, message),
        None => OpaqueFailure::new(ErrorValue::PLACEHOLDER_TYPE, text),
    }
}

/// Decode a failure payload, never failing
///
/// Payloads that cannot be understood become an opaque placeholder.
pub fn decode_failure(json: &Json) -> FailureDetail {
    let Some(obj) = json.as_object() else {
        warn!("Malformed failure payload {}, using placeholder", json);
        return OpaqueFailure::new(ErrorValue::PLACEHOLDER_TYPE, json.to_string()).into();
    };

    let nested = obj.get("nestedException").and_then(Json::as_str);

    match obj.get(CLASS_KEY).and_then(Json::as_str) {
        Some(EXPECTED_ACTUAL_CLASS) => {
            let null = Json::Null;
            let output = decode_typed(
                obj.get("@outputClass").and_then(Json::as_str),
                obj.get("output").unwrap_or(&null),
            );
            let expected_output = decode_typed(
                obj.get("@expectedOutputClass").and_then(Json::as_str),
                obj.get("expectedOutput").unwrap_or(&null),
            );
            FailureDetail::ExpectedActual(ExpectedActualFailure {
                input: decode_input(obj.get("input")),
                output,
                expected_output,
                cause: nested.map(truncate_message),
            })
        }
        Some(OPAQUE_CLASS) => parse_nested_exception(nested.unwrap_or_default()).into(),
        other => {
            warn!(
                "Unknown failure class {:?}, using placeholder",
                other.unwrap_or("<missing>")
            );
            OpaqueFailure::new(ErrorValue::PLACEHOLDER_TYPE, nested.unwrap_or_default()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Value, MAX_MESSAGE_LEN};
    use serde_json::json;

    fn encode(detail: FailureDetail) -> Json {
        serde_json::to_value(FailureDatum::from(detail)).unwrap()
    }

    #[test]
    fn test_expected_actual_field_order() {
        let failure = ExpectedActualFailure::new(3, Value::Long(4))
            .with_input("n", 2)
            .with_cause("assertion failed");
        let text = serde_json::to_string(&FailureDatum::Detail(failure.into())).unwrap();

        let positions: Vec<_> = [
            "\"@class\"",
            "\"input\"",
            "\"@outputClass\"",
            "\"output\"",
            "\"@expectedOutputClass\"",
            "\"expectedOutput\"",
            "\"nestedException\"",
        ]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_expected_actual_keeps_kinds() {
        let failure = ExpectedActualFailure::new(Value::Float(1.5), Value::Long(3))
            .with_input("xs", vec![1, 2]);
        let encoded = encode(failure.clone().into());
        assert_eq!(encoded["@outputClass"], "f32");
        assert_eq!(encoded["@expectedOutputClass"], "i64");
        assert_eq!(encoded["nestedException"], Json::Null);

        assert_eq!(decode_failure(&encoded), FailureDetail::ExpectedActual(failure));
    }

    #[test]
    fn test_opaque_failure() {
        let detail: FailureDetail = OpaqueFailure::new("io::Error", "disk full").into();
        let encoded = encode(detail.clone());
        assert_eq!(
            encoded,
            json!({"@class": "OpaqueFailure", "nestedException": "io::Error : disk full"})
        );
        assert_eq!(decode_failure(&encoded), detail);

        let bare = json!({"@class": "OpaqueFailure", "nestedException": "just text"});
        assert_eq!(
            decode_failure(&bare),
            FailureDetail::from(OpaqueFailure::new("Error", "just text"))
        );
    }

    #[test]
    fn test_unknown_class_becomes_placeholder() {
        let json = json!({
            "@class": "org.example.WeirdFailure",
            "nestedException": "java.lang.Weird : odd"
        });
        assert_eq!(
            decode_failure(&json),
            FailureDetail::from(OpaqueFailure::new("Error", "java.lang.Weird : odd"))
        );
        assert_eq!(
            decode_failure(&json!("nope")).opaque_type(),
            Some(ErrorValue::PLACEHOLDER_TYPE)
        );
    }

    #[test]
    fn test_timeout_wraps_detail() {
        let detail: FailureDetail = OpaqueFailure::new("Timeout", "after 1s").into();
        let datum = FailureDatum::Timeout(Some(detail.clone()));
        let encoded = serde_json::to_value(&datum).unwrap();
        assert_eq!(
            encoded,
            json!({
                "@class": "TimeoutFailure",
                "detail": {"@class": "OpaqueFailure", "nestedException": "Timeout : after 1s"}
            })
        );
        assert_eq!(decode_datum(&encoded), datum);

        let bare = serde_json::to_value(FailureDatum::Timeout(None)).unwrap();
        assert_eq!(bare, json!({"@class": "TimeoutFailure"}));
        assert_eq!(decode_datum(&bare), FailureDatum::Timeout(None));
    }

    #[test]
    fn test_failure_named_timeout_is_not_a_timeout() {
        let detail: FailureDetail = OpaqueFailure::new("Timeout", "user error").into();
        let decoded = decode_datum(&encode(detail.clone()));
        assert!(!decoded.is_timeout());
        assert_eq!(decoded.into_detail(), Some(detail));
    }

    #[test]
    fn test_nested_exception_is_truncated() {
        let detail: FailureDetail = OpaqueFailure::new("E", "y".repeat(20_000)).into();
        let encoded = encode(detail);
        let text = encoded["nestedException"].as_str().unwrap();
        assert_eq!(text.chars().count(), MAX_MESSAGE_LEN);

        let decoded = decode_failure(&encoded);
        assert_eq!(encode(decoded), encoded);
    }
}
