//! Document values and write operations
//!
//! Documents are JSON objects. Writes are expressed as an ordered list of
//! field operations addressed by dotted paths (`votes.0xAb…`), so a partial
//! update touches only the named sub-fields and leaves siblings alone.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

use crate::error::{StoreError, StoreResult};

/// Stored document body
pub type Document = Map<String, Value>;

/// A single field operation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    /// Replaced with the commit time
    ServerTimestamp,
    /// Numeric add; a missing field counts as zero
    Increment(i64),
    /// Append values not already present; a missing field counts as empty
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
    Delete,
}

/// Ordered field operations making up one write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData {
    ops: Vec<(String, FieldOp)>,
}

impl DocumentData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every top-level key of a JSON object as a `Set`
    pub fn from_object(object: Document) -> Self {
        Self {
            ops: object
                .into_iter()
                .map(|(k, v)| (k, FieldOp::Set(v)))
                .collect(),
        }
    }

    /// Top-level keys of any serializable struct
    pub fn from_serializable<T: Serialize>(value: &T) -> StoreResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(object) => Ok(Self::from_object(object)),
            other => Err(StoreError::InvalidPath(format!(
                "document body must be an object, got {}",
                other
            ))),
        }
    }

    pub fn op(mut self, field: impl Into<String>, op: FieldOp) -> Self {
        self.ops.push((field.into(), op));
        self
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(field, FieldOp::Set(value.into()))
    }

    /// Set only when `value` is present
    pub fn set_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn server_timestamp(self, field: impl Into<String>) -> Self {
        self.op(field, FieldOp::ServerTimestamp)
    }

    pub fn increment(self, field: impl Into<String>, by: i64) -> Self {
        self.op(field, FieldOp::Increment(by))
    }

    pub fn array_union(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.op(field, FieldOp::ArrayUnion(values))
    }

    pub fn array_remove(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.op(field, FieldOp::ArrayRemove(values))
    }

    pub fn delete(self, field: impl Into<String>) -> Self {
        self.op(field, FieldOp::Delete)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[(String, FieldOp)] {
        &self.ops
    }

    /// Apply every operation to `doc`, stamping server timestamps with `now`
    pub fn apply(&self, doc: &mut Document, now: &str) -> StoreResult<()> {
        for (path, op) in &self.ops {
            apply_op(doc, path, op, now)?;
        }
        Ok(())
    }
}

fn split_path(path: &str) -> StoreResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(format!("bad field path `{}`", path)));
    }
    Ok(segments)
}

fn apply_op(doc: &mut Document, path: &str, op: &FieldOp, now: &str) -> StoreResult<()> {
    let segments = split_path(path)?;
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(StoreError::InvalidPath("empty field path".to_string())),
    };

    let mut target = doc;
    for segment in parents {
        let entry = target
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        target = entry
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(format!("`{}` is not an object", segment)))?;
    }

    match op {
        FieldOp::Set(value) => {
            target.insert(last.to_string(), value.clone());
        }
        FieldOp::ServerTimestamp => {
            target.insert(last.to_string(), Value::String(now.to_string()));
        }
        FieldOp::Increment(by) => {
            let current = target.get(*last);
            let next = match current.and_then(Value::as_i64) {
                Some(n) => Value::Number(Number::from(n + by)),
                None => match current.and_then(Value::as_f64) {
                    Some(f) => Number::from_f64(f + *by as f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    None => Value::Number(Number::from(*by)),
                },
            };
            target.insert(last.to_string(), next);
        }
        FieldOp::ArrayUnion(values) => {
            let mut items = match target.remove(*last) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            for value in values {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
            target.insert(last.to_string(), Value::Array(items));
        }
        FieldOp::ArrayRemove(values) => {
            let items = match target.remove(*last) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let kept = items.into_iter().filter(|v| !values.contains(v)).collect();
            target.insert(last.to_string(), Value::Array(kept));
        }
        FieldOp::Delete => {
            target.remove(*last);
        }
    }
    Ok(())
}

/// Read a dotted field path
pub fn field<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Ordering across comparable JSON values; `None` when types differ
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Timestamp in the store's sortable string form
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in the store's sortable string form
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Unix seconds in the store's sortable string form
pub fn timestamp_from_unix(seconds: i64) -> StoreResult<String> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(format_timestamp)
        .ok_or_else(|| StoreError::InvalidQuery(format!("timestamp out of range: {}", seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_nested_set_preserves_siblings() {
        let mut d = doc(json!({"votes": {"0xA": {"approve": true}}}));
        DocumentData::new()
            .set("votes.0xB", json!({"approve": false}))
            .apply(&mut d, "t")
            .unwrap();

        assert_eq!(d["votes"]["0xA"]["approve"], true);
        assert_eq!(d["votes"]["0xB"]["approve"], false);
    }

    #[test]
    fn test_transforms() {
        let mut d = doc(json!({"count": 2, "tags": ["a"]}));
        DocumentData::new()
            .increment("count", 3)
            .increment("fresh", 1)
            .array_union("tags", vec![json!("a"), json!("b")])
            .array_union("others", vec![json!(1)])
            .server_timestamp("createdAt")
            .delete("missing")
            .apply(&mut d, "2026-01-01T00:00:00.000000Z")
            .unwrap();

        assert_eq!(d["count"], 5);
        assert_eq!(d["fresh"], 1);
        assert_eq!(d["tags"], json!(["a", "b"]));
        assert_eq!(d["others"], json!([1]));
        assert_eq!(d["createdAt"], "2026-01-01T00:00:00.000000Z");

        DocumentData::new()
            .array_remove("tags", vec![json!("a")])
            .delete("fresh")
            .apply(&mut d, "t")
            .unwrap();
        assert_eq!(d["tags"], json!(["b"]));
        assert!(!d.contains_key("fresh"));
    }

    #[test]
    fn test_bad_path_rejected() {
        let mut d = Document::new();
        let result = DocumentData::new().set("a..b", 1).apply(&mut d, "t");
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn test_field_lookup_and_compare() {
        let d = doc(json!({"wallet": {"address": "0xA"}, "n": 3}));
        assert_eq!(field(&d, "wallet.address"), Some(&json!("0xA")));
        assert_eq!(field(&d, "wallet.missing"), None);
        assert_eq!(field(&d, "n.deeper"), None);

        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("1"), &json!(1)), None);
    }

    #[test]
    fn test_timestamps_sort_chronologically() {
        let earlier = timestamp_from_unix(1_700_000_000).unwrap();
        let later = timestamp_from_unix(1_800_000_000).unwrap();
        assert!(earlier < later);
        assert_eq!(earlier, "2023-11-14T22:13:20.000000Z");
    }
}
