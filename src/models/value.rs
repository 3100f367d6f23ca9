//! Runtime values carried by failure payloads
//!
//! Expected/actual failures capture the unit's input, its output and the
//! expected output. Those are modelled as a closed set of value kinds so the
//! result document can keep the exact kind of every value across a round trip.

use std::fmt;

/// Value captured from a test unit
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    Str(String),
    List(Vec<Value>),
    /// Map with arbitrary keys, in insertion order
    Map(Vec<(Value, Value)>),
    Error(ErrorValue),
    /// Generic container for JSON whose kind could not be resolved
    Untyped(serde_json::Value),
}

/// Kind of a [`Value`], identified by a stable type name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Str,
    List,
    Map,
    Error,
    Untyped,
}

impl ValueKind {
    /// Type name written next to typed values in result documents
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "i32",
            ValueKind::Long => "i64",
            ValueKind::Float => "f32",
            ValueKind::Double => "f64",
            ValueKind::Str => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Error => "error",
            ValueKind::Untyped => "json",
        }
    }

    /// Resolve a type name, `None` when the name is unknown
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(ValueKind::Null),
            "bool" => Some(ValueKind::Bool),
            "i32" => Some(ValueKind::Int),
            "i64" => Some(ValueKind::Long),
            "f32" => Some(ValueKind::Float),
            "f64" => Some(ValueKind::Double),
            "string" => Some(ValueKind::Str),
            "list" => Some(ValueKind::List),
            "map" => Some(ValueKind::Map),
            "error" => Some(ValueKind::Error),
            "json" => Some(ValueKind::Untyped),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Error(_) => ValueKind::Error,
            Value::Untyped(_) => ValueKind::Untyped,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// Build a map value from key/value pairs, keeping their order
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Capture an error as a value
    pub fn error<E: std::error::Error + 'static>(err: &E) -> Self {
        Value::Error(ErrorValue::of(err))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}L"),
            Value::Float(x) => write!(f, "{x}f"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Error(err) => write!(f, "{err}"),
            Value::Untyped(json) => write!(f, "{json}"),
        }
    }
}

/// Error captured as a value: only its type name and message survive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorValue {
    pub type_name: String,
    pub message: String,
}

impl ErrorValue {
    /// Type name used when the original type is unknown
    pub const PLACEHOLDER_TYPE: &'static str = "Error";

    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn of<E: std::error::Error + 'static>(err: &E) -> Self {
        Self::new(std::any::type_name::<E>(), err.to_string())
    }

    pub fn placeholder(message: impl Into<String>) -> Self {
        Self::new(Self::PLACEHOLDER_TYPE, message)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.type_name, self.message)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ErrorValue> for Value {
    fn from(v: ErrorValue) -> Self {
        Value::Error(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_resolve_back() {
        let kinds = [
            ValueKind::Null,
            ValueKind::Bool,
            ValueKind::Int,
            ValueKind::Long,
            ValueKind::Float,
            ValueKind::Double,
            ValueKind::Str,
            ValueKind::List,
            ValueKind::Map,
            ValueKind::Error,
            ValueKind::Untyped,
        ];
        for kind in kinds {
            assert_eq!(ValueKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(ValueKind::from_type_name("java.lang.Object"), None);
    }

    #[test]
    fn test_numeric_conversions_keep_kind() {
        assert_eq!(Value::from(3).kind(), ValueKind::Int);
        assert_eq!(Value::from(3i64).kind(), ValueKind::Long);
        assert_eq!(Value::from(3.0f32).kind(), ValueKind::Float);
        assert_eq!(Value::from(3.0).kind(), ValueKind::Double);
    }

    #[test]
    fn test_map_keeps_order() {
        let map = Value::map([(Value::from(2), "b"), (Value::from(1), "a")]);
        assert_eq!(map.to_string(), "{2: \"b\", 1: \"a\"}");
    }

    #[test]
    fn test_error_value_of() {
        let err = "x".parse::<i32>().unwrap_err();
        let value = ErrorValue::of(&err);
        assert!(value.type_name.ends_with("ParseIntError"));
        assert_eq!(value.message, err.to_string());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Str("x".to_string()));
    }
}
