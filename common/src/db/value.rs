use crate::schema::ColumnType;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Serialize, Serializer};
use std::fmt;

/// a single cell, either headed into sqlite or read back out of it
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// values positionally aligned with a table's columns
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// convert a raw csv field according to its column's inferred type
    pub fn from_field(field: &str, column_type: ColumnType) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return SqlValue::Null;
        }
        match column_type {
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(SqlValue::Integer)
                .unwrap_or_else(|_| SqlValue::Text(field.to_string())),
            ColumnType::Real => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(SqlValue::Real)
                .unwrap_or_else(|| SqlValue::Text(field.to_string())),
            ColumnType::Text => SqlValue::Text(field.to_string()),
        }
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(n) => SqlValue::Integer(n),
            ValueRef::Real(x) => SqlValue::Real(x),
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(n) => ToSqlOutput::Owned(Value::Integer(*n)),
            SqlValue::Real(x) => ToSqlOutput::Owned(Value::Real(*x)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => Ok(()),
            SqlValue::Integer(n) => write!(f, "{}", n),
            SqlValue::Real(x) => write!(f, "{}", x),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Integer(n) => serializer.serialize_i64(*n),
            SqlValue::Real(x) => serializer.serialize_f64(*x),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_by_type() {
        assert_eq!(SqlValue::from_field("42", ColumnType::Integer), SqlValue::Integer(42));
        assert_eq!(SqlValue::from_field("1.5", ColumnType::Real), SqlValue::Real(1.5));
        assert_eq!(SqlValue::from_field("7", ColumnType::Real), SqlValue::Real(7.0));
        assert_eq!(
            SqlValue::from_field("42", ColumnType::Text),
            SqlValue::Text("42".to_string())
        );
    }

    #[test]
    fn test_minority_values_kept_as_text() {
        assert_eq!(
            SqlValue::from_field("n/a", ColumnType::Integer),
            SqlValue::Text("n/a".to_string())
        );
    }

    #[test]
    fn test_empty_field_is_null() {
        assert_eq!(SqlValue::from_field("", ColumnType::Text), SqlValue::Null);
        assert_eq!(SqlValue::from_field("  ", ColumnType::Integer), SqlValue::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_string(), "");
        assert_eq!(SqlValue::Blob(vec![1, 2, 3]).to_string(), "<blob 3 bytes>");
    }
}
