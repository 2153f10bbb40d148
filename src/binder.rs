//! Bind phase: re-walks compiled trees in compile order and hands each
//! operand value to a parameter sink at its 1-based index.

use crate::accessor::Accessor;
use crate::config::BlobMode;
use crate::constraint::{Constraint, Operand};
use crate::driver::Statement;
use crate::error::{DriverError, DriverResult, Result, SqlStreamError};
use crate::metamodel::{Field, FieldKind, Value};
use std::io::Read;

/// Receives positional parameters.
pub trait ParameterSink {
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()>;

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()>;

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()>;

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()>;

    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()>;

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()>;

    fn set_binary_stream(
        &mut self,
        index: usize,
        length: usize,
        reader: &mut dyn Read,
    ) -> DriverResult<()>;
}

impl<S: Statement + ?Sized> ParameterSink for S {
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()> {
        Statement::set_int(self, index, value)
    }

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()> {
        Statement::set_long(self, index, value)
    }

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()> {
        Statement::set_double(self, index, value)
    }

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()> {
        Statement::set_boolean(self, index, value)
    }

    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()> {
        Statement::set_string(self, index, value)
    }

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()> {
        Statement::set_bytes(self, index, value)
    }

    fn set_binary_stream(
        &mut self,
        index: usize,
        length: usize,
        reader: &mut dyn Read,
    ) -> DriverResult<()> {
        Statement::set_binary_stream(self, index, length, reader)
    }
}

/// Bound values collected in parameter order, for backends that take a
/// value list instead of positional setters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundValues {
    values: Vec<Value>,
}

impl BoundValues {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, index: usize, value: Value) -> DriverResult<()> {
        let Some(slot) = index.checked_sub(1) else {
            return Err(DriverError::ParameterIndex {
                index,
                count: self.values.len(),
            });
        };
        if self.values.len() <= slot {
            self.values.resize(slot + 1, Value::Null);
        }
        self.values[slot] = value;
        Ok(())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterSink for BoundValues {
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()> {
        self.put(index, Value::Integer(value))
    }

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()> {
        self.put(index, Value::Long(value))
    }

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()> {
        self.put(index, Value::Double(value))
    }

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()> {
        self.put(index, Value::Boolean(value))
    }

    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()> {
        self.put(index, Value::String(value.to_string()))
    }

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()> {
        self.put(index, Value::Blob(value.to_vec()))
    }

    fn set_binary_stream(
        &mut self,
        index: usize,
        length: usize,
        reader: &mut dyn Read,
    ) -> DriverResult<()> {
        let mut data = vec![0u8; length];
        reader.read_exact(&mut data)?;
        self.put(index, Value::Blob(data))
    }
}

/// Value coerced to the kind of its target field
#[derive(Debug, Clone, PartialEq)]
enum Coerced {
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Blob(Vec<u8>),
}

fn coerce(field: &Field, value: Value) -> Result<Coerced> {
    let mismatch = |value: &Value| SqlStreamError::KindMismatch {
        field: field.full_name(),
        expected: field.kind().as_str(),
        actual: value.type_name().to_string(),
    };
    let narrow = |wide: i64| {
        i32::try_from(wide).map_err(|_| SqlStreamError::TypeCoercion {
            column: field.full_name(),
            message: format!("value {} out of integer range", wide),
        })
    };

    match (field.kind(), value) {
        (_, Value::Null) => Err(SqlStreamError::NullLiteral {
            field: field.full_name(),
        }),
        (FieldKind::Integer, Value::Integer(v)) => Ok(Coerced::Int(v)),
        (FieldKind::Integer, Value::Long(v)) => narrow(v).map(Coerced::Int),
        (FieldKind::Integer, Value::Date(d)) => narrow(Value::epoch_day(d)).map(Coerced::Int),
        (FieldKind::Long, Value::Integer(v)) => Ok(Coerced::Long(i64::from(v))),
        (FieldKind::Long, Value::Long(v)) => Ok(Coerced::Long(v)),
        (FieldKind::Long, Value::Date(d)) => Ok(Coerced::Long(Value::epoch_day(d))),
        (FieldKind::Double, Value::Double(v)) => Ok(Coerced::Double(v)),
        (FieldKind::Double, Value::Integer(v)) => Ok(Coerced::Double(f64::from(v))),
        (FieldKind::Double, Value::Long(v)) => Ok(Coerced::Double(v as f64)),
        (FieldKind::Boolean, Value::Boolean(v)) => Ok(Coerced::Boolean(v)),
        (FieldKind::String, Value::String(v)) => Ok(Coerced::String(v)),
        (FieldKind::Blob, Value::Blob(v)) => Ok(Coerced::Blob(v)),
        (_, other) => Err(mismatch(&other)),
    }
}

/// Escape character rendered after `LIKE ?` for substring tests
pub const LIKE_ESCAPE: char = '\\';

/// Make `%`, `_` and the escape character match literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Walks compiled requests and feeds their values to a sink.
pub struct Binder<'a> {
    blob_mode: BlobMode,
    sql: &'a str,
}

impl<'a> Binder<'a> {
    pub fn new(sql: &'a str, blob_mode: BlobMode) -> Self {
        Self { blob_mode, sql }
    }

    /// Bind assignments then the constraint, checking the total against
    /// the placeholder count of the compiled request.
    pub fn bind<S: ParameterSink + ?Sized>(
        &self,
        sink: &mut S,
        values: &[(Field, Accessor)],
        constraint: Option<&Constraint>,
        compiled: usize,
    ) -> Result<usize> {
        let mut next = self.bind_values(sink, values, 1)?;
        if let Some(constraint) = constraint {
            next = self.bind_constraint(sink, constraint, next)?;
        }
        let bound = next - 1;
        if bound != compiled {
            return Err(SqlStreamError::BindCountMismatch { compiled, bound });
        }
        Ok(bound)
    }

    pub fn bind_values<S: ParameterSink + ?Sized>(
        &self,
        sink: &mut S,
        values: &[(Field, Accessor)],
        next: usize,
    ) -> Result<usize> {
        values.iter().try_fold(next, |next, (field, accessor)| {
            self.set(sink, next, field, accessor.current_value()?)?;
            Ok(next + 1)
        })
    }

    /// Bind `constraint` from index `next`; returns the next free index
    pub fn bind_constraint<S: ParameterSink + ?Sized>(
        &self,
        sink: &mut S,
        constraint: &Constraint,
        next: usize,
    ) -> Result<usize> {
        match constraint {
            Constraint::Compare { left, right, .. } => {
                let next = self.bind_operand(sink, left, next)?;
                self.bind_operand(sink, right, next)
            }
            Constraint::And(left, right) | Constraint::Or(left, right) => {
                let next = self.bind_constraint(sink, left, next)?;
                self.bind_constraint(sink, right, next)
            }
            Constraint::In { field, values } | Constraint::NotIn { field, values } => {
                values.iter().try_fold(next, |next, value| {
                    self.set(sink, next, field, value.clone())?;
                    Ok(next + 1)
                })
            }
            Constraint::IsOrNotNull { .. } => Ok(next),
            Constraint::Contains { value, .. } => {
                let pattern = format!("%{}%", escape_like(value));
                sink.set_string(next, &pattern).map_err(|source| self.failed(source))?;
                Ok(next + 1)
            }
        }
    }

    fn bind_operand<S: ParameterSink + ?Sized>(
        &self,
        sink: &mut S,
        operand: &Operand,
        next: usize,
    ) -> Result<usize> {
        match operand {
            Operand::Field(_) => Ok(next),
            Operand::Value { field, value } => {
                self.set(sink, next, field, value.clone())?;
                Ok(next + 1)
            }
            Operand::Accessor { field, accessor } => {
                self.set(sink, next, field, accessor.current_value()?)?;
                Ok(next + 1)
            }
        }
    }

    fn set<S: ParameterSink + ?Sized>(
        &self,
        sink: &mut S,
        index: usize,
        field: &Field,
        value: Value,
    ) -> Result<()> {
        let result = match coerce(field, value)? {
            Coerced::Int(v) => sink.set_int(index, v),
            Coerced::Long(v) => sink.set_long(index, v),
            Coerced::Double(v) => sink.set_double(index, v),
            Coerced::Boolean(v) => sink.set_boolean(index, v),
            Coerced::String(v) => sink.set_string(index, &v),
            Coerced::Blob(bytes) => match self.blob_mode {
                BlobMode::Native => sink.set_bytes(index, &bytes),
                BlobMode::LengthPrefixed => {
                    let mut reader = bytes.as_slice();
                    sink.set_binary_stream(index, bytes.len(), &mut reader)
                }
            },
        };
        result.map_err(|source| self.failed(source))
    }

    fn failed(&self, source: DriverError) -> SqlStreamError {
        SqlStreamError::Execution {
            sql: self.sql.to_string(),
            source,
        }
    }
}
