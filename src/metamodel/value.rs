//! Field kinds and the values that flow between fields, binders and rows.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Declared value kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldKind {
    Integer,
    Long,
    Double,
    Boolean,
    String,
    Blob,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Long => "long",
            FieldKind::Double => "double",
            FieldKind::Boolean => "boolean",
            FieldKind::String => "string",
            FieldKind::Blob => "blob",
        }
    }

    /// Check if a value can be stored in a field of this kind without conversion
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (FieldKind::Integer, Value::Integer(_))
                | (FieldKind::Long, Value::Long(_))
                | (FieldKind::Long, Value::Integer(_))
                | (FieldKind::Double, Value::Double(_))
                | (FieldKind::Boolean, Value::Boolean(_))
                | (FieldKind::String, Value::String(_))
                | (FieldKind::Blob, Value::Blob(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values flowing through literals, bound parameters and result rows.
///
/// `Date` never appears in a literal built by calling code; it is what a
/// backend hands back for date columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Date(_) => "date",
        }
    }

    /// Days since 1970-01-01.
    pub fn epoch_day(date: NaiveDate) -> i64 {
        i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
    }
}

const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
