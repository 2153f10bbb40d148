//! SELECT compilation.

use super::where_clause::WhereCompiler;
use super::{resolve_column, Placeholder, TableList};
use crate::accessor::ColumnAccessor;
use crate::constraint::Constraint;
use crate::error::{Result, SqlStreamError};
use crate::metamodel::Field;
use crate::naming::NamingResolver;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: Field,
    pub direction: Direction,
}

/// Everything a select builder accumulates before compiling.
pub struct SelectRequest<'a> {
    /// Selected fields with their result accessors, in insertion order
    pub fields: &'a [(Field, ColumnAccessor)],
    pub constraint: Option<&'a Constraint>,
    pub orders: &'a [Order],
    pub top: Option<usize>,
    pub distinct: &'a [Field],
}

/// Compiled SELECT with its column and placeholder assignments.
#[derive(Debug)]
pub struct CompiledSelect {
    pub sql: String,
    /// Selected fields that received a result column
    pub columns: Vec<(Field, ColumnAccessor)>,
    pub placeholders: Vec<Placeholder>,
}

/// Compile a select request, assigning each resolved accessor its 1-based
/// result column. Unresolved selected or ordered fields are skipped unless
/// `strict` is set. Accessors are left untouched when compilation fails.
pub fn compile_select(
    request: &SelectRequest<'_>,
    naming: &dyn NamingResolver,
    strict: bool,
) -> Result<CompiledSelect> {
    if request.fields.is_empty() {
        return Err(SqlStreamError::EmptySelection);
    }

    let mut tables = TableList::default();
    let mut projection = Vec::new();
    let mut columns = Vec::new();
    let mut distinct = false;
    for (field, accessor) in request.fields {
        let Some(column) = resolve_column(naming, field, strict)? else {
            continue;
        };
        let table = naming.table_name(field.entity());
        projection.push(format!("{}.{}", table, column));
        tables.add(table);
        accessor.check_index(projection.len())?;
        columns.push((field.clone(), accessor.clone()));
        distinct |= request.distinct.contains(field);
    }
    if projection.is_empty() {
        return Err(SqlStreamError::EmptySelection);
    }

    let mut predicate = None;
    let mut placeholders = Vec::new();
    if let Some(constraint) = request.constraint {
        let mut compiler = WhereCompiler::new(naming);
        compiler.compile(constraint, 1)?;
        for table in compiler.tables().tables() {
            tables.add(table.clone());
        }
        let (sql, assigned) = compiler.finish();
        predicate = Some(sql);
        placeholders = assigned;
    }

    let mut sql = String::from("SELECT ");
    if distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&projection.join(", "));
    write!(sql, " FROM {}", tables.join()).ok();
    if let Some(predicate) = predicate {
        write!(sql, " WHERE {}", predicate).ok();
    }

    let mut orders = Vec::new();
    for order in request.orders {
        if let Some(column) = resolve_column(naming, &order.field, strict)? {
            orders.push(format!("{} {}", column, order.direction.keyword()));
        }
    }
    if !orders.is_empty() {
        write!(sql, " ORDER BY {}", orders.join(", ")).ok();
    }
    if let Some(top) = request.top {
        write!(sql, " LIMIT {}", top).ok();
    }

    for (position, (_, accessor)) in columns.iter().enumerate() {
        accessor.assign_index(position + 1)?;
    }

    log::debug!("Compiled select: {}", sql);
    Ok(CompiledSelect {
        sql,
        columns,
        placeholders,
    })
}
