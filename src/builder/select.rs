//! Select builder and the compiled query it produces.

use crate::accessor::{
    BlobAccessor, BooleanAccessor, ColumnAccessor, DoubleAccessor, IntegerAccessor, LongAccessor,
    StringAccessor,
};
use crate::binder::Binder;
use crate::compiler::{compile_select, Direction, Order, SelectRequest};
use crate::constraint::Constraint;
use crate::cursor::RowCursor;
use crate::driver::{RowSet, SharedStatement};
use crate::error::{Result, SqlStreamError};
use crate::metamodel::{
    BlobField, BooleanField, DoubleField, EntityType, Field, IntegerField, LongField, StringField,
};
use crate::record::Record;
use crate::session::SqlSession;
use std::mem;

enum Source {
    Entity(EntityType),
    Sql(String),
}

/// Accumulates a selection, ordering, limit and constraint.
pub struct SelectBuilder {
    session: SqlSession,
    source: Source,
    constraint: Option<Constraint>,
    fields: Vec<(Field, ColumnAccessor)>,
    orders: Vec<Order>,
    top: Option<usize>,
    distinct: Vec<Field>,
}

impl SelectBuilder {
    pub(crate) fn for_entity(
        session: SqlSession,
        entity: EntityType,
        constraint: Option<Constraint>,
    ) -> Self {
        Self::with_source(session, Source::Entity(entity), constraint)
    }

    pub(crate) fn for_sql(
        session: SqlSession,
        sql: String,
        constraint: Option<Constraint>,
    ) -> Self {
        Self::with_source(session, Source::Sql(sql), constraint)
    }

    fn with_source(session: SqlSession, source: Source, constraint: Option<Constraint>) -> Self {
        Self {
            session,
            source,
            constraint,
            fields: Vec::new(),
            orders: Vec::new(),
            top: None,
            distinct: Vec::new(),
        }
    }

    /// Add a field to the selection. Selecting a field twice keeps one column.
    pub fn select(&mut self, field: &Field) -> &mut Self {
        self.retrieve(field);
        self
    }

    /// Select every field of the entity type
    pub fn select_all(&mut self) -> &mut Self {
        let fields = match &self.source {
            Source::Entity(entity) => entity.fields(),
            Source::Sql(_) => Vec::new(),
        };
        for field in fields {
            self.retrieve(&field);
        }
        self
    }

    /// Select the key fields of the entity type
    pub fn with_keys(&mut self) -> &mut Self {
        let keys = match &self.source {
            Source::Entity(entity) => entity.key_fields(),
            Source::Sql(_) => Vec::new(),
        };
        for field in keys {
            self.retrieve(&field);
        }
        self
    }

    /// AND an additional constraint onto the current one
    pub fn filter(&mut self, constraint: Constraint) -> &mut Self {
        self.constraint = Constraint::and_all([self.constraint.take(), Some(constraint)]);
        self
    }

    /// Select `field` and return the handle reading its column
    pub fn retrieve(&mut self, field: &Field) -> ColumnAccessor {
        if let Some((_, accessor)) = self.fields.iter().find(|(f, _)| f == field) {
            return accessor.clone();
        }
        let accessor = ColumnAccessor::new(field.clone());
        self.fields.push((field.clone(), accessor.clone()));
        accessor
    }

    pub fn retrieve_integer(&mut self, field: &IntegerField) -> IntegerAccessor {
        IntegerAccessor::new(self.retrieve(field))
    }

    pub fn retrieve_long(&mut self, field: &LongField) -> LongAccessor {
        LongAccessor::new(self.retrieve(field))
    }

    pub fn retrieve_double(&mut self, field: &DoubleField) -> DoubleAccessor {
        DoubleAccessor::new(self.retrieve(field))
    }

    pub fn retrieve_boolean(&mut self, field: &BooleanField) -> BooleanAccessor {
        BooleanAccessor::new(self.retrieve(field))
    }

    pub fn retrieve_string(&mut self, field: &StringField) -> StringAccessor {
        StringAccessor::new(self.retrieve(field))
    }

    pub fn retrieve_blob(&mut self, field: &BlobField) -> BlobAccessor {
        BlobAccessor::new(self.retrieve(field))
    }

    pub fn order_asc(&mut self, field: &Field) -> &mut Self {
        self.orders.push(Order {
            field: field.clone(),
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(&mut self, field: &Field) -> &mut Self {
        self.orders.push(Order {
            field: field.clone(),
            direction: Direction::Desc,
        });
        self
    }

    /// Limit the number of returned rows
    pub fn top(&mut self, count: usize) -> &mut Self {
        self.top = Some(count);
        self
    }

    /// Render `SELECT DISTINCT` when any of `fields` is selected
    pub fn distinct(&mut self, fields: &[Field]) -> &mut Self {
        self.distinct.extend(fields.iter().cloned());
        self
    }

    /// Compile and prepare; the statement closes once a cursor is exhausted
    /// when the session is configured to auto-close.
    pub fn get_query(&mut self) -> Result<SelectQuery> {
        let auto_close = self.session.config().auto_close;
        self.build(auto_close)
    }

    /// Compile and prepare a query that stays open across executions
    pub fn get_not_auto_close_query(&mut self) -> Result<SelectQuery> {
        self.build(false)
    }

    fn build(&mut self, auto_close: bool) -> Result<SelectQuery> {
        let fields = mem::take(&mut self.fields);
        let orders = mem::take(&mut self.orders);
        let distinct = mem::take(&mut self.distinct);
        let constraint = self.constraint.take();
        let top = self.top.take();

        match &self.source {
            Source::Entity(_) => {
                let request = SelectRequest {
                    fields: &fields,
                    constraint: constraint.as_ref(),
                    orders: &orders,
                    top,
                    distinct: &distinct,
                };
                let compiled = compile_select(
                    &request,
                    self.session.naming(),
                    self.session.config().strict_column_resolution,
                )?;
                let statement = self.session.prepare(&compiled.sql)?;
                Ok(SelectQuery {
                    parameter_count: compiled.placeholders.len(),
                    sql: compiled.sql,
                    statement,
                    columns: compiled.columns,
                    constraint,
                    auto_close,
                    session: self.session.clone(),
                })
            }
            Source::Sql(sql) => {
                if fields.is_empty() {
                    return Err(SqlStreamError::EmptySelection);
                }
                let statement = self.session.prepare(sql)?;
                let columns = self.match_columns(sql, &statement, fields)?;
                Ok(SelectQuery {
                    sql: sql.clone(),
                    statement,
                    columns,
                    parameter_count: constraint.as_ref().map_or(0, Constraint::parameter_count),
                    constraint,
                    auto_close,
                    session: self.session.clone(),
                })
            }
        }
    }

    /// Assign accessors of caller-written SQL by result column name
    fn match_columns(
        &self,
        sql: &str,
        statement: &SharedStatement,
        fields: Vec<(Field, ColumnAccessor)>,
    ) -> Result<Vec<(Field, ColumnAccessor)>> {
        let names = statement
            .with(|stmt| stmt.result_columns())
            .ok_or_else(|| SqlStreamError::QueryClosed {
                sql: sql.to_string(),
            })?
            .map_err(|source| SqlStreamError::Prepare {
                sql: sql.to_string(),
                source,
            })?;

        let naming = self.session.naming();
        let strict = self.session.config().strict_column_resolution;
        let mut columns = Vec::new();
        for (field, accessor) in fields {
            let position = naming.column_name(&field).and_then(|column| {
                names
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(&column))
            });
            match position {
                Some(position) => {
                    accessor.check_index(position + 1)?;
                    columns.push((position + 1, field, accessor));
                }
                None if strict => {
                    return Err(SqlStreamError::UnresolvedColumn {
                        field: field.full_name(),
                    })
                }
                None => log::warn!(
                    "No result column for field {} in: {}",
                    field.full_name(),
                    sql
                ),
            }
        }
        columns
            .into_iter()
            .map(|(index, field, accessor)| -> Result<(Field, ColumnAccessor)> {
                accessor.assign_index(index)?;
                Ok((field, accessor))
            })
            .collect()
    }
}

/// Compiled, prepared select. Each execution re-binds the constraint, so
/// accessors fed by the caller are read again.
pub struct SelectQuery {
    sql: String,
    statement: SharedStatement,
    columns: Vec<(Field, ColumnAccessor)>,
    constraint: Option<Constraint>,
    parameter_count: usize,
    auto_close: bool,
    session: SqlSession,
}

impl SelectQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn is_closed(&self) -> bool {
        self.statement.is_closed()
    }

    /// Bind and run the query, returning a cursor over its rows
    pub fn execute(&mut self) -> Result<RowCursor> {
        let binder = Binder::new(&self.sql, self.session.config().blob_mode);
        let constraint = self.constraint.as_ref();
        let expected = self.parameter_count;
        let sql = &self.sql;

        let rows: Box<dyn RowSet> = self
            .statement
            .with(|stmt| -> Result<Box<dyn RowSet>> {
                binder.bind(stmt, &[], constraint, expected)?;
                stmt.execute_query().map_err(|source| SqlStreamError::Execution {
                    sql: sql.clone(),
                    source,
                })
            })
            .ok_or_else(|| SqlStreamError::QueryClosed { sql: sql.clone() })??;

        log::debug!("Executed: {}", self.sql);
        Ok(RowCursor::open(
            rows,
            self.columns.clone(),
            self.statement.clone(),
            self.auto_close,
            self.sql.clone(),
        ))
    }

    /// Execute and materialize every row
    pub fn execute_as_records(&mut self) -> Result<Vec<Record>> {
        self.execute()?.collect_records()
    }

    /// Execute expecting exactly one row
    pub fn execute_unique(&mut self) -> Result<Record> {
        let mut cursor = self.execute()?;
        if !cursor.next()? {
            return Err(SqlStreamError::NotFound {
                sql: self.sql.clone(),
            });
        }
        let record = cursor.record()?;
        if cursor.next()? {
            cursor.close()?;
            return Err(SqlStreamError::TooManyRows {
                sql: self.sql.clone(),
            });
        }
        Ok(record)
    }

    /// Release the prepared statement; closing twice does nothing
    pub fn close(&mut self) -> Result<()> {
        self.statement
            .close()
            .map_err(|source| SqlStreamError::Execution {
                sql: self.sql.clone(),
                source,
            })
    }
}
