//! Field extraction for untyped command payloads.
//!
//! `null`, a missing key and an empty string all count as absent. Numeric
//! fields accept JSON numbers and numeric strings.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BridgeError;

fn present<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    match payload.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.is_empty() => None,
        Some(value) => Some(value),
    }
}

pub fn optional_string(payload: &Value, field: &str) -> Result<Option<String>, BridgeError> {
    match present(payload, field) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(BridgeError::validation(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}

pub fn required_string(payload: &Value, field: &str) -> Result<String, BridgeError> {
    optional_string(payload, field)?
        .ok_or_else(|| BridgeError::validation(field, "missing required string"))
}

pub fn optional_index(payload: &Value, field: &str) -> Result<Option<u64>, BridgeError> {
    match present(payload, field) {
        None => Ok(None),
        Some(Value::Number(number)) => number.as_u64().map(Some).ok_or_else(|| {
            BridgeError::validation(
                field,
                format!("expected a non-negative integer, got {number}"),
            )
        }),
        Some(Value::String(text)) => text.trim().parse::<u64>().map(Some).map_err(|err| {
            BridgeError::validation(field, format!("cannot parse '{text}' as an index: {err}"))
        }),
        Some(other) => Err(BridgeError::validation(
            field,
            format!("expected a number, got {other}"),
        )),
    }
}

pub fn required<T: DeserializeOwned>(payload: &Value, field: &str) -> Result<T, BridgeError> {
    let value = payload
        .get(field)
        .filter(|value| !value.is_null())
        .ok_or_else(|| BridgeError::validation(field, "missing required value"))?;
    serde_json::from_value(value.clone())
        .map_err(|err| BridgeError::validation(field, err.to_string()))
}

pub fn optional_value(payload: &Value, field: &str) -> Value {
    payload.get(field).cloned().unwrap_or(Value::Null)
}
