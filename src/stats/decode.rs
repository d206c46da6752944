//! Lenient decoding of statistics documents
//!
//! serverStatus output is loosely typed: the same counter may arrive as a
//! 32-bit int, a 64-bit long, a double, or an Extended JSON wrapper such as
//! `{"$numberLong": "123"}` depending on engine version and on how the
//! document was serialized. A field that cannot be read as a number decodes
//! to `0.0` so one bad value never costs the rest of the scrape.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Extended JSON wrappers carrying a numeric payload
const NUMBER_WRAPPERS: [&str; 4] = ["$numberDouble", "$numberLong", "$numberInt", "$numberDecimal"];

/// Convert a document value to a finite `f64`, falling back to zero
pub fn value_to_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(map) => NUMBER_WRAPPERS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(|inner| match inner {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// `deserialize_with` adapter for numeric statistics fields
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

/// `deserialize_with` adapter for optional subsystem documents
///
/// A missing key is handled by `#[serde(default)]`; this covers the key being
/// present with `null` or a non-document value, both of which mean "absent".
pub fn lenient_subsystem<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode_subsystem(value))
}

/// Decode one subsystem document, treating anything but a document as absent
pub fn decode_subsystem<T: DeserializeOwned>(value: Value) -> Option<T> {
    match value {
        Value::Object(_) => match serde_json::from_value(value) {
            Ok(stats) => Some(stats),
            Err(e) => {
                debug!("Dropping undecodable subsystem document: {}", e);
                None
            }
        },
        Value::Null => None,
        other => {
            debug!("Ignoring non-document subsystem value: {}", kind_of(&other));
            None
        }
    }
}

/// Short JSON type name for log and error messages
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "document",
    }
}
