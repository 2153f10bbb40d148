//! Update builder.

use super::{Assignments, MutationRequest, SqlRequest};
use crate::accessor::Accessor;
use crate::compiler::compile_update;
use crate::constraint::Constraint;
use crate::error::Result;
use crate::metamodel::{EntityType, Field, TypedField, Value};
use crate::session::SqlSession;

/// Collects assignments applied to the rows matching a constraint.
pub struct UpdateBuilder {
    session: SqlSession,
    entity: EntityType,
    constraint: Option<Constraint>,
    values: Assignments,
}

impl UpdateBuilder {
    pub(crate) fn new(
        session: SqlSession,
        entity: EntityType,
        constraint: Option<Constraint>,
    ) -> Self {
        Self {
            session,
            entity,
            constraint,
            values: Assignments::default(),
        }
    }

    pub fn set<F: TypedField>(&mut self, field: &F, value: impl Into<F::Native>) -> &mut Self {
        let native: F::Native = value.into();
        self.values
            .set(field.as_field(), Accessor::Literal(native.into()));
        self
    }

    pub fn set_accessor(&mut self, field: &Field, accessor: impl Into<Accessor>) -> &mut Self {
        self.values.set(field, accessor.into());
        self
    }

    pub fn set_value(&mut self, field: &Field, value: impl Into<Value>) -> Result<&mut Self> {
        self.values.set_value(field, value.into())?;
        Ok(self)
    }

    pub fn get_request(&mut self) -> Result<MutationRequest> {
        let values = self.values.take();
        let constraint = self.constraint.take();
        let compiled = compile_update(
            &self.entity,
            &values,
            constraint.as_ref(),
            self.session.naming(),
            self.session.config().strict_column_resolution,
        )?;
        MutationRequest::prepare(&self.session, compiled)
    }

    /// Update once and release the statement
    pub fn run(&mut self) -> Result<u64> {
        let mut request = self.get_request()?;
        let count = request.run()?;
        request.close()?;
        Ok(count)
    }
}
