//! Pure functions for converting cached values to and from bytes.
//!
//! Objects and arrays are stored as JSON text, strings are stored raw so they
//! stay readable from any client, and other scalars use their JSON form.

use serde_json::Value;

use super::{CacheError, Result};

/// The shape a caller expects a cached value to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueShape {
    /// A JSON object.
    Object,
    /// A JSON array.
    #[default]
    Sequence,
    /// Plain text, returned without JSON decoding.
    Text,
}

impl ValueShape {
    /// Infers the shape of a value. Scalars other than arrays and objects are text.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Sequence,
            _ => Self::Text,
        }
    }

    /// The empty value returned when a key is missing or unreadable.
    pub fn default_value(self) -> Value {
        match self {
            Self::Object => Value::Object(serde_json::Map::new()),
            Self::Sequence => Value::Array(Vec::new()),
            Self::Text => Value::String(String::new()),
        }
    }

    /// Whether cached text of this shape must be JSON-decoded.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Object | Self::Sequence)
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Sequence => value.is_array(),
            Self::Text => true,
        }
    }
}

/// Encodes a value into the bytes stored under a cache key.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::String(text) => Ok(text.as_bytes().to_vec()),
        other => serde_json::to_vec(other).map_err(|e| CacheError::Serialization(e.to_string())),
    }
}

/// Decodes raw cache bytes as UTF-8 text.
pub fn decode_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Interprets cached text according to the expected shape.
///
/// Structured shapes are JSON-decoded and must decode to the same shape; a
/// cached `[1, 2]` read as an object is a serialization error.
pub fn decode_value(text: String, shape: ValueShape) -> Result<Value> {
    if !shape.is_structured() {
        return Ok(Value::String(text));
    }

    let value: Value =
        serde_json::from_str(&text).map_err(|e| CacheError::Serialization(e.to_string()))?;

    if shape.matches(&value) {
        Ok(value)
    } else {
        Err(CacheError::Serialization(format!(
            "expected {shape:?}, found {}",
            describe(&value)
        )))
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip_object() {
        let value = json!({"user": 7, "tags": ["a", "b"], "active": true});

        let bytes = encode_value(&value).expect("encode should succeed");
        let text = decode_text(bytes).expect("utf-8");
        let decoded = decode_value(text, ValueShape::Object).expect("decode should succeed");

        assert_eq!(decoded, value);
    }

    #[test]
    fn test_roundtrip_sequence() {
        let value = json!([1, "two", {"three": 3}]);

        let bytes = encode_value(&value).expect("encode should succeed");
        let decoded = decode_value(decode_text(bytes).unwrap(), ValueShape::Sequence).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn test_strings_are_stored_raw() {
        let bytes = encode_value(&json!("hello")).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_scalars_use_json_text() {
        assert_eq!(encode_value(&json!(42)).unwrap(), b"42");
        assert_eq!(encode_value(&json!(true)).unwrap(), b"true");
        assert_eq!(encode_value(&Value::Null).unwrap(), b"null");
    }

    #[test]
    fn test_text_shape_skips_json_decoding() {
        let decoded = decode_value("{not json".to_string(), ValueShape::Text).unwrap();
        assert_eq!(decoded, json!("{not json"));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let result = decode_value("{not json".to_string(), ValueShape::Object);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_shape_mismatch_is_serialization_error() {
        let result = decode_value("[1, 2]".to_string(), ValueShape::Object);

        let err = result.unwrap_err();
        assert_eq!(
            err,
            CacheError::Serialization("expected Object, found array".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_is_serialization_error() {
        let result = decode_text(vec![0xff, 0xfe]);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ValueShape::Object.default_value(), json!({}));
        assert_eq!(ValueShape::Sequence.default_value(), json!([]));
        assert_eq!(ValueShape::Text.default_value(), json!(""));
    }

    #[test]
    fn test_shape_of() {
        assert_eq!(ValueShape::of(&json!({})), ValueShape::Object);
        assert_eq!(ValueShape::of(&json!([])), ValueShape::Sequence);
        assert_eq!(ValueShape::of(&json!(3.5)), ValueShape::Text);
    }
}
