//! Prepared mutations.

use super::checked_literal;
use crate::accessor::Accessor;
use crate::binder::Binder;
use crate::compiler::CompiledMutation;
use crate::config::BlobMode;
use crate::driver::SharedStatement;
use crate::error::{Result, SqlStreamError};
use crate::metamodel::{Field, Value};
use crate::session::SqlSession;

/// A prepared request that can be run repeatedly until closed.
pub trait SqlRequest {
    /// Bind the current values and run; returns the number of affected rows
    fn run(&mut self) -> Result<u64>;

    fn close(&mut self) -> Result<()>;

    fn sql(&self) -> &str;
}

/// Compiled insert, update or delete bound to its prepared statement.
pub struct MutationRequest {
    compiled: CompiledMutation,
    statement: SharedStatement,
    blob_mode: BlobMode,
}

impl MutationRequest {
    pub(crate) fn prepare(session: &SqlSession, compiled: CompiledMutation) -> Result<Self> {
        let statement = session.prepare(&compiled.sql)?;
        Ok(Self {
            compiled,
            statement,
            blob_mode: session.config().blob_mode,
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.compiled.parameter_count()
    }

    pub fn is_closed(&self) -> bool {
        self.statement.is_closed()
    }
}

impl MutationRequest {
    /// Bind `values` in place of the compiled assignments, then the constraint
    fn execute(&self, values: &[(Field, Accessor)]) -> Result<u64> {
        let compiled = &self.compiled;
        let binder = Binder::new(&compiled.sql, self.blob_mode);
        let count = self
            .statement
            .with(|stmt| -> Result<u64> {
                binder.bind(
                    stmt,
                    values,
                    compiled.constraint.as_ref(),
                    compiled.parameter_count(),
                )?;
                stmt.execute_update().map_err(|source| SqlStreamError::Execution {
                    sql: compiled.sql.clone(),
                    source,
                })
            })
            .ok_or_else(|| SqlStreamError::QueryClosed {
                sql: compiled.sql.clone(),
            })??;
        log::debug!("{} rows affected by: {}", count, compiled.sql);
        Ok(count)
    }
}

impl SqlRequest for MutationRequest {
    fn run(&mut self) -> Result<u64> {
        self.execute(&self.compiled.values)
    }

    fn close(&mut self) -> Result<()> {
        self.statement
            .close()
            .map_err(|source| SqlStreamError::Execution {
                sql: self.compiled.sql.clone(),
                source,
            })
    }

    fn sql(&self) -> &str {
        &self.compiled.sql
    }
}

/// Prepared insert run once per row. Columns are fixed by the builder that
/// produced it; a row may override any of them with its own literal values.
pub struct BulkRequest {
    request: MutationRequest,
    inserted: u64,
}

impl BulkRequest {
    pub(crate) fn new(request: MutationRequest) -> Self {
        Self {
            request,
            inserted: 0,
        }
    }

    /// Insert one row. Fields missing from `row` keep the builder's value or
    /// accessor.
    pub fn insert(&mut self, row: &[(Field, Value)]) -> Result<u64> {
        let mut values = self.request.compiled.values.clone();
        for (field, value) in row {
            let slot = values
                .iter_mut()
                .find(|(f, _)| f == field)
                .ok_or_else(|| SqlStreamError::UnresolvedColumn {
                    field: field.full_name(),
                })?;
            slot.1 = checked_literal(field, value.clone())?;
        }
        let count = self.request.execute(&values)?;
        self.inserted += count;
        Ok(count)
    }

    /// Insert every row, stopping at the first failure
    pub fn insert_all<I>(&mut self, rows: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<[(Field, Value)]>,
    {
        let mut total = 0;
        for row in rows {
            total += self.insert(row.as_ref())?;
        }
        Ok(total)
    }

    /// Rows inserted through this request so far
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn is_closed(&self) -> bool {
        self.request.is_closed()
    }
}

impl SqlRequest for BulkRequest {
    /// Insert one row from the builder's values and accessors
    fn run(&mut self) -> Result<u64> {
        let count = self.request.run()?;
        self.inserted += count;
        Ok(count)
    }

    fn close(&mut self) -> Result<()> {
        log::debug!(
            "Closing bulk insert after {} rows: {}",
            self.inserted,
            self.request.sql()
        );
        self.request.close()
    }

    fn sql(&self) -> &str {
        self.request.sql()
    }
}
