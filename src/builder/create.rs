//! Insert builder.

use super::{Assignments, BulkRequest, MutationRequest, SqlRequest};
use crate::accessor::Accessor;
use crate::compiler::compile_insert;
use crate::error::Result;
use crate::metamodel::{EntityType, Field, TypedField, Value};
use crate::session::SqlSession;

/// Collects the values of one row to insert.
pub struct CreateBuilder {
    session: SqlSession,
    entity: EntityType,
    values: Assignments,
}

impl CreateBuilder {
    pub(crate) fn new(session: SqlSession, entity: EntityType) -> Self {
        Self {
            session,
            entity,
            values: Assignments::default(),
        }
    }

    /// Set a typed literal value
    pub fn set<F: TypedField>(&mut self, field: &F, value: impl Into<F::Native>) -> &mut Self {
        let native: F::Native = value.into();
        self.values.set(field.as_field(), Accessor::Literal(native.into()));
        self
    }

    /// Set a value read from `accessor` each time the request runs
    pub fn set_accessor(&mut self, field: &Field, accessor: impl Into<Accessor>) -> &mut Self {
        self.values.set(field, accessor.into());
        self
    }

    /// Set an untyped value, checked against the field's kind
    pub fn set_value(&mut self, field: &Field, value: impl Into<Value>) -> Result<&mut Self> {
        self.values.set_value(field, value.into())?;
        Ok(self)
    }

    pub fn get_request(&mut self) -> Result<MutationRequest> {
        let values = self.values.take();
        let compiled = compile_insert(
            &self.entity,
            &values,
            self.session.naming(),
            self.session.config().strict_column_resolution,
        )?;
        MutationRequest::prepare(&self.session, compiled)
    }

    /// Prepare the insert once for many rows. The values set so far fix the
    /// inserted columns and act as defaults for each row.
    pub fn get_bulk_request(&mut self) -> Result<BulkRequest> {
        self.get_request().map(BulkRequest::new)
    }

    /// Insert once and release the statement
    pub fn run(&mut self) -> Result<u64> {
        let mut request = self.get_request()?;
        let count = request.run()?;
        request.close()?;
        Ok(count)
    }
}
