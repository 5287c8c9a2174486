//! SQLite value and row conversion functions.
//!
//! Pure functions between `FieldValue`/`Record` and rusqlite's dynamic values.
//! These are testable in isolation without database access.

use kvdao_core::storage::{FieldValue, Record};
use rusqlite::types::Value;
use rusqlite::Row;

/// Convert a field value to a SQLite value. Booleans are stored as 0/1.
pub fn to_sql_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(v) => Value::Integer(i64::from(v)),
        FieldValue::Integer(v) => Value::Integer(v),
        FieldValue::Real(v) => Value::Real(v),
        FieldValue::Text(v) => Value::Text(v),
        FieldValue::Blob(v) => Value::Blob(v),
    }
}

/// Convert a SQLite value to a field value.
pub fn from_sql_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Integer(v) => FieldValue::Integer(v),
        Value::Real(v) => FieldValue::Real(v),
        Value::Text(v) => FieldValue::Text(v),
        Value::Blob(v) => FieldValue::Blob(v),
    }
}

/// Convert a SQLite row to a record keyed by the statement's column names.
pub fn row_to_record(row: &Row, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        let value: Value = row.get(index)?;
        record.insert(column.as_str(), from_sql_value(value));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_stored_as_integer() {
        assert_eq!(to_sql_value(FieldValue::Bool(true)), Value::Integer(1));
        assert_eq!(to_sql_value(FieldValue::Bool(false)), Value::Integer(0));
    }

    #[test]
    fn test_scalar_values_map_one_to_one() {
        assert_eq!(to_sql_value(FieldValue::Null), Value::Null);
        assert_eq!(to_sql_value(FieldValue::Integer(-3)), Value::Integer(-3));
        assert_eq!(to_sql_value(FieldValue::Real(1.5)), Value::Real(1.5));
        assert_eq!(
            to_sql_value(FieldValue::Text("hi".to_string())),
            Value::Text("hi".to_string())
        );
        assert_eq!(
            from_sql_value(Value::Blob(vec![1, 2])),
            FieldValue::Blob(vec![1, 2])
        );
        assert_eq!(from_sql_value(Value::Null), FieldValue::Null);
    }

    #[test]
    fn test_row_to_record_uses_column_names() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let columns = vec!["id".to_string(), "name".to_string(), "note".to_string()];

        let record = conn
            .query_row("SELECT 7 AS id, 'Ada' AS name, NULL AS note", [], |row| {
                row_to_record(row, &columns)
            })
            .unwrap();

        assert_eq!(record.get("id"), Some(&FieldValue::Integer(7)));
        assert_eq!(
            record.get("name"),
            Some(&FieldValue::Text("Ada".to_string()))
        );
        assert_eq!(record.get("note"), Some(&FieldValue::Null));
    }
}
