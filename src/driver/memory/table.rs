//! Table storage for the in-memory backend.

use crate::metamodel::{FieldKind, Value};
use anyhow::{bail, Result};
use chrono::{Days, NaiveDate};

/// Declared type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Double,
    Boolean,
    Varchar,
    Blob,
    Date,
}

impl ColumnType {
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Integer => ColumnType::Integer,
            FieldKind::Long => ColumnType::BigInt,
            FieldKind::Double => ColumnType::Double,
            FieldKind::Boolean => ColumnType::Boolean,
            FieldKind::String => ColumnType::Varchar,
            FieldKind::Blob => ColumnType::Blob,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Blob => "BLOB",
            ColumnType::Date => "DATE",
        }
    }

    /// Convert a written value to the stored representation of this column
    pub fn normalize(&self, value: Value) -> Result<Value> {
        let stored = match (self, value) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Integer, Value::Integer(v)) => Value::Integer(v),
            (ColumnType::Integer, Value::Long(v)) => match i32::try_from(v) {
                Ok(v) => Value::Integer(v),
                Err(_) => bail!("Value {} out of range for INTEGER", v),
            },
            (ColumnType::BigInt, Value::Integer(v)) => Value::Long(i64::from(v)),
            (ColumnType::BigInt, Value::Long(v)) => Value::Long(v),
            (ColumnType::Double, Value::Double(v)) => Value::Double(v),
            (ColumnType::Double, Value::Integer(v)) => Value::Double(f64::from(v)),
            (ColumnType::Double, Value::Long(v)) => Value::Double(v as f64),
            (ColumnType::Boolean, Value::Boolean(v)) => Value::Boolean(v),
            (ColumnType::Varchar, Value::String(v)) => Value::String(v),
            (ColumnType::Blob, Value::Blob(v)) => Value::Blob(v),
            (ColumnType::Date, Value::Date(v)) => Value::Date(v),
            (ColumnType::Date, Value::Integer(v)) => Value::Date(date_from_epoch_day(i64::from(v))?),
            (ColumnType::Date, Value::Long(v)) => Value::Date(date_from_epoch_day(v)?),
            (column_type, value) => bail!(
                "Cannot store {} in {} column",
                value.type_name(),
                column_type.as_sql()
            ),
        };
        Ok(stored)
    }
}

fn date_from_epoch_day(day: i64) -> Result<NaiveDate> {
    let Some(epoch) = NaiveDate::from_ymd_opt(1970, 1, 1) else {
        bail!("Invalid epoch date");
    };
    let date = if day >= 0 {
        epoch.checked_add_days(Days::new(day.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(day.unsigned_abs()))
    };
    match date {
        Some(date) => Ok(date),
        None => bail!("Epoch day {} out of range for DATE", day),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

/// A named table holding fully materialized rows
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Position of a column, case-insensitive
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row given values for a subset of columns; others are NULL
    pub fn insert(&mut self, assigned: Vec<(usize, Value)>) -> Result<()> {
        let mut row = vec![Value::Null; self.columns.len()];
        for (index, value) in assigned {
            let stored = self.normalize(index, value)?;
            row[index] = stored;
        }
        self.rows.push(row);
        Ok(())
    }

    /// Normalize a value for the given column
    pub fn normalize(&self, index: usize, value: Value) -> Result<Value> {
        match self.columns.get(index) {
            Some(column) => column.column_type.normalize(value),
            None => bail!("Column index {} out of range for {}", index, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> MemoryTable {
        MemoryTable::new(
            "PERSON",
            vec![
                ColumnDef {
                    name: "ID".to_string(),
                    column_type: ColumnType::Integer,
                },
                ColumnDef {
                    name: "BORN".to_string(),
                    column_type: ColumnType::Date,
                },
                ColumnDef {
                    name: "SCORE".to_string(),
                    column_type: ColumnType::Double,
                },
            ],
        )
    }

    #[test]
    fn test_insert_normalizes() {
        let mut table = person();
        table
            .insert(vec![(0, Value::Long(7)), (1, Value::Integer(31))])
            .unwrap();

        let row = &table.rows()[0];
        assert_eq!(row[0], Value::Integer(7));
        assert_eq!(
            row[1],
            Value::Date(NaiveDate::from_ymd_opt(1970, 2, 1).unwrap())
        );
        assert_eq!(row[2], Value::Null);
    }

    #[test]
    fn test_insert_rejects_mismatch() {
        let mut table = person();
        assert!(table
            .insert(vec![(0, Value::String("x".to_string()))])
            .is_err());
        assert!(table.insert(vec![(0, Value::Long(3_000_000_000))]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_column_lookup() {
        let table = person();
        assert_eq!(table.column_index("born"), Some(1));
        assert_eq!(table.column_index("missing"), None);
        assert_eq!(ColumnType::for_kind(FieldKind::Long), ColumnType::BigInt);
    }
}
