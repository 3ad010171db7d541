//! Read-only view over one raw JSON item.

use crate::{error::Error, result::Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw item as returned by the API, exposed read-only.
///
/// Every field of the payload stays reachable through [`Record::get`] and
/// [`Record::get_or`], including ones this library has no accessor for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    data: Map<String, Value>,
}

impl Record {
    /// Wraps a JSON object.
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Wraps a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAnObject`] for any other kind of value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self::new(data)),
            other => Err(Error::NotAnObject(kind(&other).to_string())),
        }
    }

    /// The raw value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// The value of `field` decoded as `T`, or `default` when the field is
    /// absent, `null`, or of another type.
    pub fn get_or<T: DeserializeOwned>(&self, field: &str, default: T) -> T {
        match self.data.get(field) {
            None | Some(Value::Null) => default,
            Some(value) => T::deserialize(value).unwrap_or(default),
        }
    }

    /// Whether the payload carries `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    /// Numeric `id` of the item.
    pub fn id(&self) -> Option<u64> {
        self.data.get("id").and_then(Value::as_u64)
    }

    /// Field names present in the payload.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// The whole payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Unwraps the payload.
    pub fn into_inner(self) -> Map<String, Value> {
        self.data
    }

    /// Swaps the payload for a fresh one.
    pub(crate) fn replace(&mut self, fresh: Record) {
        self.data = fresh.data;
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn unknown_fields_pass_through() {
        let record = record(json!({ "id": 7, "mystery": [1, 2] }));
        assert_eq!(record.id(), Some(7));
        assert_eq!(record.get("mystery"), Some(&json!([1, 2])));
        assert!(record.contains("mystery"));
        assert!(record.get("absent").is_none());
    }

    #[test]
    fn get_or_falls_back_to_the_default() {
        let record = record(json!({ "score": 12, "name": null, "tags": "safe" }));
        assert_eq!(record.get_or("score", 0_i64), 12);
        assert_eq!(record.get_or("absent", 5_u64), 5);
        assert_eq!(record.get_or("name", "anonymous".to_string()), "anonymous");
        assert_eq!(record.get_or("tags", 0_u64), 0);
        assert_eq!(record.get_or::<Vec<u64>>("absent", vec![]), Vec::<u64>::new());
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            Record::from_value(json!([1])),
            Err(Error::NotAnObject(kind)) if kind == "an array"
        ));
    }
}
