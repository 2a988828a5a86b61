//! Payload model for records received from the remote API
//!
//! Response bodies are converted from JSON into [`FieldValue`] once, at the
//! gateway boundary. Everything downstream (identifier discovery, projection
//! onto table columns) works on this type rather than on raw JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::LIST_ENVELOPE_KEY;

/// One record as returned by the API: field name to value.
pub type Record = BTreeMap<String, FieldValue>;

/// A single JSON-compatible value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(Record),
}

impl FieldValue {
    /// Convert back into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// True for values that carry no data: null, `""`, `[]` and `{}`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on a map value; `None` for every other variant.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Render the value as a path identifier.
    ///
    /// Strings and numbers qualify. Integral floats render without a fraction
    /// so `7.0` and `7` address the same resource.
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("{f:.0}"))
            }
            Self::Float(f) if f.is_finite() => Some(f.to_string()),
            _ => None,
        }
    }

    /// Strip the `{"items": [...]}` list envelope if present.
    pub fn unwrap_envelope(self) -> Self {
        match self {
            Self::Map(mut map) if map.contains_key(LIST_ENVELOPE_KEY) => {
                map.remove(LIST_ENVELOPE_KEY).unwrap_or_default()
            }
            other => other,
        }
    }

    /// Split a payload into records.
    ///
    /// An object yields one record and an array yields one record per object
    /// element. Returns the records together with the positions of elements
    /// that were not objects (a scalar payload is rejected at position 0).
    pub fn into_records(self) -> (Vec<Record>, Vec<usize>) {
        match self {
            Self::Null => (Vec::new(), Vec::new()),
            Self::Map(map) => (vec![map], Vec::new()),
            Self::List(items) => {
                let mut records = Vec::with_capacity(items.len());
                let mut rejected = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        Self::Map(map) => records.push(map),
                        _ => rejected.push(index),
                    }
                }
                (records, rejected)
            }
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) | Self::Text(_) => {
                (Vec::new(), vec![0])
            }
        }
    }

    /// Name of the variant, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_json_numbers_by_kind() {
        assert_eq!(FieldValue::from(json!(42)), FieldValue::Integer(42));
        assert_eq!(FieldValue::from(json!(1.5)), FieldValue::Float(1.5));
        assert_eq!(FieldValue::from(json!(u64::MAX)), FieldValue::Float(u64::MAX as f64));
    }

    #[test]
    fn nested_objects_become_maps() {
        let value = FieldValue::from(json!({"id": 1, "tags": ["a", null], "owner": {"name": "x"}}));
        assert_eq!(value.get("id"), Some(&FieldValue::Integer(1)));
        assert_eq!(
            value.get("tags"),
            Some(&FieldValue::List(vec![FieldValue::Text("a".into()), FieldValue::Null]))
        );
        assert_eq!(
            value.get("owner").and_then(|o| o.get("name")),
            Some(&FieldValue::Text("x".into()))
        );
        assert_eq!(value.to_json(), json!({"id": 1, "tags": ["a", null], "owner": {"name": "x"}}));
    }

    #[test]
    fn emptiness_covers_null_and_empty_containers() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::from(json!([])).is_empty());
        assert!(FieldValue::from(json!({})).is_empty());
        assert!(FieldValue::from(json!("")).is_empty());
        assert!(!FieldValue::from(json!(0)).is_empty());
        assert!(!FieldValue::from(json!(false)).is_empty());
    }

    #[test]
    fn identifiers_accept_numbers_and_strings_only() {
        assert_eq!(FieldValue::Integer(7).as_identifier().as_deref(), Some("7"));
        assert_eq!(FieldValue::Float(7.0).as_identifier().as_deref(), Some("7"));
        assert_eq!(FieldValue::Float(2.5).as_identifier().as_deref(), Some("2.5"));
        assert_eq!(FieldValue::Text("A-1".into()).as_identifier().as_deref(), Some("A-1"));
        assert_eq!(FieldValue::Null.as_identifier(), None);
        assert_eq!(FieldValue::Bool(true).as_identifier(), None);
        assert_eq!(FieldValue::from(json!({"id": 1})).as_identifier(), None);
    }

    #[test]
    fn envelope_is_unwrapped_only_when_present() {
        let wrapped = FieldValue::from(json!({"items": [{"id": 1}], "total": 1}));
        assert_eq!(wrapped.unwrap_envelope(), FieldValue::from(json!([{"id": 1}])));

        let bare = FieldValue::from(json!([{"id": 2}]));
        assert_eq!(bare.clone().unwrap_envelope(), bare);

        let object = FieldValue::from(json!({"id": 3}));
        assert_eq!(object.clone().unwrap_envelope(), object);
    }

    #[test]
    fn into_records_reports_non_object_positions() {
        let (records, rejected) =
            FieldValue::from(json!([{"id": 1}, 5, {"id": 2}, "x"])).into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(rejected, vec![1, 3]);

        let (records, rejected) = FieldValue::from(json!({"id": 9})).into_records();
        assert_eq!(records.len(), 1);
        assert!(rejected.is_empty());

        let (records, rejected) = FieldValue::from(json!("scalar")).into_records();
        assert!(records.is_empty());
        assert_eq!(rejected, vec![0]);
    }

    #[test]
    fn deserializes_untagged() {
        let value: FieldValue = serde_json::from_str(r#"{"a": [1, 2.5, true, null]}"#).unwrap();
        assert_eq!(
            value.get("a"),
            Some(&FieldValue::List(vec![
                FieldValue::Integer(1),
                FieldValue::Float(2.5),
                FieldValue::Bool(true),
                FieldValue::Null,
            ]))
        );
    }
}
