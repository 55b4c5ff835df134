//! Forgiving field readers for payloads written by models or other tools.
//!
//! Numbers may arrive as JSON numbers or numeric strings; anything else
//! reads as absent rather than failing the whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read a finite number from a JSON number or a numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Read a non-blank string.
pub fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// `deserialize_with` adapter for optional numbers.
pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(as_f64))
}

/// `deserialize_with` adapter for optional strings.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(as_str).map(str::to_string))
}
