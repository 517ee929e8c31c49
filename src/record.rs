//! Generic view over upstream JSON objects
//!
//! DefiLlama payloads are loosely typed: fields come and go between
//! endpoints and over time, and some figures arrive as strings. `RawRecord`
//! keeps the object as-is (insertion order preserved) and exposes accessors
//! that return `None` for anything absent or of the wrong shape, so callers
//! never need to special-case a missing field.
//!
//! Field names may be dotted paths (`circulating.peggedUSD`) to reach into
//! nested objects.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Value at `field`, following dots into nested objects
    pub fn get(&self, field: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(field) {
            return Some(value).filter(|v| !v.is_null());
        }
        let mut parts = field.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current).filter(|v| !v.is_null())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Numeric value; numeric strings such as `"12.5"` are accepted
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }

    /// String values of a categorical field: a single string, or every
    /// string in an array. Empty for absent or non-string fields.
    pub fn labels(&self, field: &str) -> Vec<&str> {
        match self.get(field) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Rendering of a scalar field for display, `None` if absent
    pub fn display(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for RawRecord {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::upstream_format(format!(
                "expected an object, got {}",
                kind_of(&other)
            ))),
        }
    }
}

/// Turn a JSON array of objects into records.
///
/// Non-object elements are skipped. `what` names the collection in errors.
pub fn records_from(value: &Value, what: &str) -> Result<Vec<RawRecord>> {
    let items = value.as_array().ok_or_else(|| {
        Error::upstream_format(format!("expected {} to be a list, got {}", what, kind_of(value)))
    })?;
    Ok(items
        .iter()
        .filter_map(|item| item.as_object().cloned().map(RawRecord))
        .collect())
}

/// Array found under `field` of an object payload, or the payload itself if
/// it is already an array.
pub fn records_at(payload: &Value, field: &str) -> Result<Vec<RawRecord>> {
    match payload {
        Value::Array(_) => records_from(payload, field),
        Value::Object(map) => {
            let inner = map.get(field).ok_or_else(|| {
                Error::upstream_format(format!("response is missing '{}'", field))
            })?;
            records_from(inner, field)
        }
        other => Err(Error::upstream_format(format!(
            "expected an object with '{}', got {}",
            field,
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::try_from(value).unwrap()
    }

    #[test]
    fn absent_and_null_fields_read_as_none() {
        let r = record(json!({"tvl": null, "name": "Aave"}));
        assert_eq!(r.number("tvl"), None);
        assert_eq!(r.number("missing"), None);
        assert!(!r.contains("tvl"));
        assert_eq!(r.text("name"), Some("Aave"));
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let r = record(json!({"a": 1.5, "b": "2.25", "c": "n/a", "d": true}));
        assert_eq!(r.number("a"), Some(1.5));
        assert_eq!(r.number("b"), Some(2.25));
        assert_eq!(r.number("c"), None);
        assert_eq!(r.number("d"), None);
    }

    #[test]
    fn dotted_paths_reach_nested_values() {
        let r = record(json!({
            "circulating": {"peggedUSD": 1.0e9},
            "odd.key": 3
        }));
        assert_eq!(r.number("circulating.peggedUSD"), Some(1.0e9));
        assert_eq!(r.number("circulating.peggedEUR"), None);
        assert_eq!(r.number("odd.key"), Some(3.0));
    }

    #[test]
    fn labels_handle_strings_and_arrays() {
        let r = record(json!({
            "chain": "Ethereum",
            "chains": ["Ethereum", "Arbitrum", 7],
            "tvl": 5
        }));
        assert_eq!(r.labels("chain"), vec!["Ethereum"]);
        assert_eq!(r.labels("chains"), vec!["Ethereum", "Arbitrum"]);
        assert!(r.labels("tvl").is_empty());
        assert!(r.labels("missing").is_empty());
    }

    #[test]
    fn records_at_accepts_wrapped_or_bare_lists() {
        let wrapped = json!({"status": "success", "data": [{"pool": "a"}, 5, {"pool": "b"}]});
        let bare = json!([{"pool": "a"}]);

        assert_eq!(records_at(&wrapped, "data").unwrap().len(), 2);
        assert_eq!(records_at(&bare, "data").unwrap().len(), 1);
        assert!(matches!(
            records_at(&json!({"status": "error"}), "data"),
            Err(Error::UpstreamFormat(_))
        ));
        assert!(matches!(
            records_at(&json!("nope"), "data"),
            Err(Error::UpstreamFormat(_))
        ));
    }

    #[test]
    fn key_order_is_preserved() {
        let r = record(json!({"z": 1, "a": 2, "m": 3}));
        let keys: Vec<&String> = r.as_map().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }
}
