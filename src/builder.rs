//! Fluent builders assembling select and mutation requests.
//!
//! Builders are single-use: producing a request drains their accumulated
//! fields, values and constraint.

pub mod create;
pub mod request;
pub mod select;
pub mod update;

pub use create::CreateBuilder;
pub use request::{BulkRequest, MutationRequest, SqlRequest};
pub use select::{SelectBuilder, SelectQuery};
pub use update::UpdateBuilder;

use crate::accessor::Accessor;
use crate::error::{Result, SqlStreamError};
use crate::metamodel::{Field, Value};

/// Field assignments of a create or update builder, last write wins
#[derive(Debug, Default)]
pub(crate) struct Assignments {
    values: Vec<(Field, Accessor)>,
}

impl Assignments {
    pub(crate) fn set(&mut self, field: &Field, accessor: Accessor) {
        match self.values.iter_mut().find(|(f, _)| f == field) {
            Some(slot) => slot.1 = accessor,
            None => self.values.push((field.clone(), accessor)),
        }
    }

    /// Literal assignment checked against the declared kind of `field`
    pub(crate) fn set_value(&mut self, field: &Field, value: Value) -> Result<()> {
        let accessor = checked_literal(field, value)?;
        self.set(field, accessor);
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<(Field, Accessor)> {
        std::mem::take(&mut self.values)
    }
}

/// Literal accessor for `value`, rejecting nulls and values of another kind
pub(crate) fn checked_literal(field: &Field, value: Value) -> Result<Accessor> {
    if value.is_null() {
        return Err(SqlStreamError::NullLiteral {
            field: field.full_name(),
        });
    }
    if !field.kind().accepts(&value) {
        return Err(SqlStreamError::KindMismatch {
            field: field.full_name(),
            expected: field.kind().as_str(),
            actual: value.type_name().to_string(),
        });
    }
    Ok(Accessor::Literal(value))
}
