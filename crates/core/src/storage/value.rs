//! Column values and records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::FieldError;

/// A single column value, independent of the database driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Human readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts the value into a typed Rust value.
    pub fn into_typed<T: FromFieldValue>(self) -> Result<T, FieldError> {
        T::from_field_value(self)
    }

    fn mismatch(self, expected: &'static str) -> FieldError {
        FieldError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Conversion from a [`FieldValue`] into a typed field.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError>;
}

impl FromFieldValue for bool {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Bool(v) => Ok(v),
            // SQLite has no boolean storage class.
            FieldValue::Integer(0) => Ok(false),
            FieldValue::Integer(1) => Ok(true),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Integer(v) => Ok(v),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Real(v) => Ok(v),
            FieldValue::Integer(v) => Ok(v as f64),
            other => Err(other.mismatch("real")),
        }
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Text(v) => Ok(v),
            other => Err(other.mismatch("text")),
        }
    }
}

impl FromFieldValue for Vec<u8> {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Blob(v) => Ok(v),
            other => Err(other.mismatch("blob")),
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for FieldValue {
    /// Arrays and objects are kept as JSON text.
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(v),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

/// A set of named column values, ordered by name.
///
/// Used both as input for creates and updates and as the shape of rows
/// returned by a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a record from a JSON object.
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> Self {
        object.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_accepts_sqlite_integers() {
        assert_eq!(FieldValue::Integer(1).into_typed::<bool>(), Ok(true));
        assert_eq!(FieldValue::Integer(0).into_typed::<bool>(), Ok(false));
        assert!(FieldValue::Integer(2).into_typed::<bool>().is_err());
    }

    #[test]
    fn test_option_maps_null_to_none() {
        assert_eq!(FieldValue::Null.into_typed::<Option<String>>(), Ok(None));
        assert_eq!(
            FieldValue::from("x").into_typed::<Option<String>>(),
            Ok(Some("x".to_string()))
        );
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let err = FieldValue::from("seven").into_typed::<i64>().unwrap_err();
        assert_eq!(
            err,
            FieldError::TypeMismatch {
                expected: "integer",
                found: "text"
            }
        );
    }

    #[test]
    fn test_from_json_value() {
        assert_eq!(FieldValue::from(json!(3)), FieldValue::Integer(3));
        assert_eq!(FieldValue::from(json!(2.5)), FieldValue::Real(2.5));
        assert_eq!(FieldValue::from(json!(null)), FieldValue::Null);
        assert_eq!(
            FieldValue::from(json!({"a": 1})),
            FieldValue::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_record_from_json_object() {
        let object = json!({"name": "Ada", "ready": true})
            .as_object()
            .cloned()
            .unwrap();

        let record = Record::from_json(object);

        assert_eq!(record.get("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(record.get("ready"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_display_quotes_text() {
        assert_eq!(FieldValue::from("x").to_string(), "'x'");
        assert_eq!(FieldValue::Null.to_string(), "NULL");
    }
}
