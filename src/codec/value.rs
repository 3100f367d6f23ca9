//! Value encoding
//!
//! Values are written as plain JSON. Where the kind of a value matters on
//! the way back (the output and expected output of a failure) its type name
//! travels next to it, and [`decode_typed`] uses it. Everything else goes
//! through [`decode_untyped`], which picks the narrowest kind that re-encodes
//! to the same JSON.

use serde_json::{json, Map as JsonMap, Number, Value as Json};
use tracing::warn;

use crate::models::{truncate_message, ErrorValue, Value, ValueKind, MAX_MESSAGE_LEN};

const NAN: &str = "NaN";
const INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";

/// Encode a value without its type name
pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Long(n) => Json::from(*n),
        Value::Float(x) => {
            // Shortest decimal form of the f32, not of its f64 widening.
            let wide = x.to_string().parse::<f64>().unwrap_or(f64::from(*x));
            encode_float(wide)
        }
        Value::Double(x) => encode_float(*x),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(encode_value).collect()),
        Value::Map(entries) => Json::Array(
            entries
                .iter()
                .map(|(k, v)| json!({ "key": encode_value(k), "value": encode_value(v) }))
                .collect(),
        ),
        Value::Error(err) => encode_error(err),
        Value::Untyped(json) => json.clone(),
    }
}

fn encode_float(x: f64) -> Json {
    match Number::from_f64(x) {
        Some(n) => Json::Number(n),
        None if x.is_nan() => Json::String(NAN.to_string()),
        None if x > 0.0 => Json::String(INFINITY.to_string()),
        None => Json::String(NEG_INFINITY.to_string()),
    }
}

fn decode_float(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            NAN => Some(f64::NAN),
            INFINITY => Some(f64::INFINITY),
            NEG_INFINITY => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn encode_error(err: &ErrorValue) -> Json {
    json!({
        "typeName": err.type_name,
        "message": truncate_message(&err.message),
    })
}

fn decode_error(json: &Json) -> Option<ErrorValue> {
    let obj = json.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let type_name = obj.get("typeName")?.as_str()?;
    let message = obj.get("message")?.as_str()?;
    Some(ErrorValue::new(type_name, message))
}

/// An error value only re-encodes unchanged while its message fits
fn fits_error(err: &ErrorValue) -> bool {
    err.message.chars().nth(MAX_MESSAGE_LEN).is_none()
}

fn is_pair(json: &Json) -> bool {
    json.as_object()
        .is_some_and(|obj| obj.len() == 2 && obj.contains_key("key") && obj.contains_key("value"))
}

fn decode_pairs(items: &[Json]) -> Vec<(Value, Value)> {
    items
        .iter()
        .filter_map(Json::as_object)
        .map(|obj| {
            let key = obj.get("key").map(decode_untyped).unwrap_or(Value::Null);
            let value = obj.get("value").map(decode_untyped).unwrap_or(Value::Null);
            (key, value)
        })
        .collect()
}

/// Decode a value whose kind was not recorded
pub fn decode_untyped(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Value::Int(small),
                    Err(_) => Value::Long(i),
                }
            } else if n.is_u64() {
                Value::Untyped(json.clone())
            } else {
                n.as_f64()
                    .map(Value::Double)
                    .unwrap_or_else(|| Value::Untyped(json.clone()))
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) if !items.is_empty() && items.iter().all(is_pair) => {
            Value::Map(decode_pairs(items))
        }
        Json::Array(items) => Value::List(items.iter().map(decode_untyped).collect()),
        Json::Object(_) => match decode_error(json).filter(fits_error) {
            Some(err) => Value::Error(err),
            None => Value::Untyped(json.clone()),
        },
    }
}

/// Decode a value using the type name written next to it
///
/// Unknown type names and values that do not fit the named kind are not
/// errors: the value is kept as [`Value::Untyped`].
pub fn decode_typed(type_name: Option<&str>, json: &Json) -> Value {
    let Some(name) = type_name else {
        return decode_untyped(json);
    };
    let Some(kind) = ValueKind::from_type_name(name) else {
        warn!("Unknown value type '{}', keeping raw JSON", name);
        return Value::Untyped(json.clone());
    };

    let decoded = match kind {
        ValueKind::Null => json.is_null().then_some(Value::Null),
        ValueKind::Bool => json.as_bool().map(Value::Bool),
        ValueKind::Int => json
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int),
        ValueKind::Long => json.as_i64().map(Value::Long),
        ValueKind::Float => decode_float(json).map(|x| Value::Float(x as f32)),
        ValueKind::Double => decode_float(json).map(Value::Double),
        ValueKind::Str => json.as_str().map(|s| Value::Str(s.to_string())),
        ValueKind::List => json
            .as_array()
            .map(|items| Value::List(items.iter().map(decode_untyped).collect())),
        ValueKind::Map => match json {
            Json::Array(items) if items.iter().all(is_pair) => Some(Value::Map(decode_pairs(items))),
            Json::Object(obj) => Some(Value::Map(
                obj.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), decode_untyped(v)))
                    .collect(),
            )),
            _ => None,
        },
        ValueKind::Error => Some(Value::Error(
            decode_error(json).unwrap_or_else(|| ErrorValue::placeholder(json.to_string())),
        )),
        ValueKind::Untyped => Some(Value::Untyped(json.clone())),
    };

    decoded.unwrap_or_else(|| {
        warn!("Value {} does not match type '{}', keeping raw JSON", json, name);
        Value::Untyped(json.clone())
    })
}

/// Encode input pairs as `[{key, value}]`
pub fn encode_input(input: &[(String, Value)]) -> Json {
    Json::Array(
        input
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": encode_value(v) }))
            .collect(),
    )
}

/// Decode input pairs, accepting both the pair list and a plain object
pub fn decode_input(json: Option<&Json>) -> Vec<(String, Value)> {
    match json {
        Some(Json::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let Some(obj) = item.as_object() else {
                    warn!("Skipping malformed input entry {}", item);
                    return None;
                };
                let key = match obj.get("key") {
                    Some(Json::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let value = obj.get("value").map(decode_untyped).unwrap_or(Value::Null);
                Some((key, value))
            })
            .collect(),
        Some(Json::Object(obj)) => decode_object_input(obj),
        Some(Json::Null) | None => Vec::new(),
        Some(other) => {
            warn!("Ignoring malformed input {}", other);
            Vec::new()
        }
    }
}

fn decode_object_input(obj: &JsonMap<String, Json>) -> Vec<(String, Value)> {
    obj.iter()
        .map(|(k, v)| (k.clone(), decode_untyped(v)))
        .collect()
}
