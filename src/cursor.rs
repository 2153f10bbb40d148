//! Row cursor over one executed query.
//!
//! The cursor moves through `Unopened -> Open(row_id >= 1) -> Closed`; the
//! transitions are irreversible. Row-bound accessors attached to the cursor
//! read the current row lazily, converting the raw backend value to the
//! declared kind of their field.

use crate::accessor::ColumnAccessor;
use crate::driver::{RowSet, SharedStatement};
use crate::error::{DriverError, Result, SqlStreamError};
use crate::metamodel::{Field, FieldKind, Value};
use crate::record::Record;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPhase {
    Unopened,
    Open,
    Closed,
}

pub(crate) type SharedCursor = Arc<Mutex<CursorState>>;

pub(crate) struct CursorState {
    rows: Option<Box<dyn RowSet>>,
    phase: CursorPhase,
    row_id: usize,
}

impl CursorState {
    fn new(rows: Box<dyn RowSet>) -> Self {
        Self {
            rows: Some(rows),
            phase: CursorPhase::Unopened,
            row_id: 0,
        }
    }

    fn current_row(&mut self, field: &Field) -> Result<&mut dyn RowSet> {
        match (self.phase, self.rows.as_deref_mut()) {
            (CursorPhase::Open, Some(rows)) => Ok(rows),
            _ => Err(SqlStreamError::NoCurrentRow {
                field: field.full_name(),
            }),
        }
    }

    /// Read column `index` of the current row as the kind declared by `field`
    pub(crate) fn read(&mut self, index: usize, field: &Field) -> Result<Value> {
        let rows = self.current_row(field)?;
        match field.kind() {
            FieldKind::Integer => read_integer(rows, index),
            FieldKind::Long => read_long(rows, index),
            FieldKind::Double => read_double(rows, index),
            FieldKind::Boolean => {
                let value = rows
                    .get_boolean(index)
                    .map_err(|e| coercion(rows, index, e.to_string()))?;
                Ok(if rows.was_null() {
                    Value::Null
                } else {
                    Value::Boolean(value)
                })
            }
            FieldKind::String => match object(rows, index)? {
                Value::Null => Ok(Value::Null),
                Value::String(s) => Ok(Value::String(s)),
                other => Err(cannot_convert(rows, index, &other)),
            },
            FieldKind::Blob => {
                let bytes = rows
                    .get_bytes(index)
                    .map_err(|e| coercion(rows, index, e.to_string()))?;
                Ok(bytes.map_or(Value::Null, Value::Blob))
            }
        }
    }
}

fn column_label(rows: &dyn RowSet, index: usize) -> String {
    rows.column_name(index)
        .unwrap_or_else(|| format!("#{}", index))
}

fn coercion(rows: &dyn RowSet, index: usize, message: String) -> SqlStreamError {
    SqlStreamError::TypeCoercion {
        column: column_label(rows, index),
        message,
    }
}

fn cannot_convert(rows: &dyn RowSet, index: usize, value: &Value) -> SqlStreamError {
    coercion(rows, index, format!("Can not convert {}", value))
}

fn object(rows: &mut dyn RowSet, index: usize) -> Result<Value> {
    rows.get_object(index)
        .map_err(|e| coercion(rows, index, e.to_string()))
}

fn integral(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn read_integer(rows: &mut dyn RowSet, index: usize) -> Result<Value> {
    let wide = match object(rows, index)? {
        Value::Null => return Ok(Value::Null),
        Value::Integer(v) => return Ok(Value::Integer(v)),
        Value::Long(v) => v,
        Value::Date(date) => Value::epoch_day(date),
        Value::Double(d) => match integral(d) {
            Some(v) => v,
            None => return Err(cannot_convert(rows, index, &Value::Double(d))),
        },
        other => return Err(cannot_convert(rows, index, &other)),
    };
    i32::try_from(wide)
        .map(Value::Integer)
        .map_err(|_| coercion(rows, index, format!("value {} out of integer range", wide)))
}

fn read_long(rows: &mut dyn RowSet, index: usize) -> Result<Value> {
    match object(rows, index)? {
        Value::Null => Ok(Value::Null),
        Value::Integer(v) => Ok(Value::Long(i64::from(v))),
        Value::Long(v) => Ok(Value::Long(v)),
        Value::Date(date) => Ok(Value::Long(Value::epoch_day(date))),
        Value::Double(d) => integral(d)
            .map(Value::Long)
            .ok_or_else(|| cannot_convert(rows, index, &Value::Double(d))),
        other => Err(cannot_convert(rows, index, &other)),
    }
}

/// A zero read is checked against the was-null probe before it is reported.
fn read_double(rows: &mut dyn RowSet, index: usize) -> Result<Value> {
    match rows.get_double(index) {
        Ok(value) => {
            if value == 0.0 && rows.was_null() {
                Ok(Value::Null)
            } else {
                Ok(Value::Double(value))
            }
        }
        Err(DriverError::Conversion { .. }) => match object(rows, index)? {
            Value::Null => Ok(Value::Null),
            Value::Double(d) => Ok(Value::Double(d)),
            Value::Integer(v) => Ok(Value::Double(f64::from(v))),
            Value::Long(v) => Ok(Value::Double(v as f64)),
            other => Err(cannot_convert(rows, index, &other)),
        },
        Err(e) => Err(coercion(rows, index, e.to_string())),
    }
}

/// Live iterator over the rows of one executed query.
pub struct RowCursor {
    state: SharedCursor,
    columns: Vec<(Field, ColumnAccessor)>,
    statement: SharedStatement,
    auto_close: bool,
    sql: String,
}

impl RowCursor {
    pub(crate) fn open(
        rows: Box<dyn RowSet>,
        columns: Vec<(Field, ColumnAccessor)>,
        statement: SharedStatement,
        auto_close: bool,
        sql: String,
    ) -> Self {
        let state = Arc::new(Mutex::new(CursorState::new(rows)));
        for (_, accessor) in &columns {
            accessor.attach(&state);
        }
        Self {
            state,
            columns,
            statement,
            auto_close,
            sql,
        }
    }

    /// Advance to the next row. Returns `false` and closes the cursor when
    /// the rows are exhausted; advancing a closed cursor is an error.
    pub fn next(&mut self) -> Result<bool> {
        let advanced = {
            let mut state = self.state.lock();
            let rows = match (state.phase, state.rows.as_mut()) {
                (CursorPhase::Closed, _) | (_, None) => return Err(SqlStreamError::CursorClosed),
                (_, Some(rows)) => rows,
            };
            match rows.next() {
                Ok(true) => {
                    state.row_id += 1;
                    state.phase = CursorPhase::Open;
                    Ok(true)
                }
                Ok(false) => Ok(false),
                Err(source) => Err(SqlStreamError::Execution {
                    sql: self.sql.clone(),
                    source,
                }),
            }
        };

        match advanced {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.close()?;
                Ok(false)
            }
            Err(e) => {
                // Release resources before surfacing the failure
                if let Err(close_err) = self.close() {
                    log::warn!("Failed to close cursor after error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// 1-based id of the current row, 0 before the first advance
    pub fn row_id(&self) -> usize {
        self.state.lock().row_id
    }

    pub fn phase(&self) -> CursorPhase {
        self.state.lock().phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase() == CursorPhase::Closed
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.columns.iter().map(|(field, _)| field)
    }

    pub fn accessor(&self, field: &Field) -> Option<&ColumnAccessor> {
        self.columns
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, accessor)| accessor)
    }

    /// Materialize the current row
    pub fn record(&self) -> Result<Record> {
        let mut record = Record::new();
        for (field, accessor) in &self.columns {
            // Fields skipped at compile time have no column
            if accessor.index().is_none() {
                continue;
            }
            record.set(field.clone(), accessor.read_value()?);
        }
        Ok(record)
    }

    /// Drain the remaining rows into records
    pub fn collect_records(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while self.next()? {
            records.push(self.record()?);
        }
        Ok(records)
    }

    /// Release the row set and, for auto-close requests, the prepared
    /// statement. Closing an already closed cursor does nothing.
    pub fn close(&mut self) -> Result<()> {
        let rows = {
            let mut state = self.state.lock();
            if state.phase == CursorPhase::Closed {
                return Ok(());
            }
            state.phase = CursorPhase::Closed;
            state.rows.take()
        };
        log::debug!("Closing cursor after {} rows: {}", self.row_id(), self.sql);

        let mut result = Ok(());
        if let Some(mut rows) = rows {
            if let Err(source) = rows.close() {
                result = Err(SqlStreamError::Execution {
                    sql: self.sql.clone(),
                    source,
                });
            }
        }
        if self.auto_close {
            if let Err(source) = self.statement.close() {
                result = result.and(Err(SqlStreamError::Execution {
                    sql: self.sql.clone(),
                    source,
                }));
            }
        }
        result
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close cursor on drop: {}", e);
        }
    }
}
