//! Predicate rendering.

use super::{Placeholder, TableList};
use crate::binder::LIKE_ESCAPE;
use crate::constraint::{Constraint, Operand};
use crate::error::{Result, SqlStreamError};
use crate::metamodel::Field;
use crate::naming::NamingResolver;
use std::fmt::Write;

/// Renders a constraint tree, recording one placeholder per bound leaf.
pub struct WhereCompiler<'a> {
    naming: &'a dyn NamingResolver,
    sql: String,
    placeholders: Vec<Placeholder>,
    tables: TableList,
}

impl<'a> WhereCompiler<'a> {
    pub fn new(naming: &'a dyn NamingResolver) -> Self {
        Self {
            naming,
            sql: String::new(),
            placeholders: Vec::new(),
            tables: TableList::default(),
        }
    }

    /// Render `constraint` starting at placeholder `next`; returns the next free index
    pub fn compile(&mut self, constraint: &Constraint, next: usize) -> Result<usize> {
        match constraint {
            Constraint::Compare { op, left, right } => {
                let next = self.operand(left, next)?;
                write!(self.sql, " {} ", op.symbol()).ok();
                self.operand(right, next)
            }
            Constraint::And(left, right) => self.logical("AND", left, right, next),
            Constraint::Or(left, right) => self.logical("OR", left, right, next),
            Constraint::In { field, values } => self.in_list(field, values.len(), false, next),
            Constraint::NotIn { field, values } => self.in_list(field, values.len(), true, next),
            Constraint::IsOrNotNull { field, is_null } => {
                let column = self.column(field)?;
                let test = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                write!(self.sql, "{} {}", column, test).ok();
                Ok(next)
            }
            Constraint::Contains {
                field, contains, ..
            } => {
                let column = self.column(field)?;
                let like = if *contains { "LIKE" } else { "NOT LIKE" };
                write!(self.sql, "{} {} ? ESCAPE '{}'", column, like, LIKE_ESCAPE).ok();
                Ok(self.placeholder(field, next))
            }
        }
    }

    fn logical(
        &mut self,
        keyword: &str,
        left: &Constraint,
        right: &Constraint,
        next: usize,
    ) -> Result<usize> {
        self.sql.push('(');
        let next = self.compile(left, next)?;
        write!(self.sql, " {} ", keyword).ok();
        let next = self.compile(right, next)?;
        self.sql.push(')');
        Ok(next)
    }

    fn in_list(&mut self, field: &Field, count: usize, negated: bool, next: usize) -> Result<usize> {
        let column = self.column(field)?;
        if count == 0 {
            // Nothing is in an empty list
            self.sql.push_str(if negated { "1 = 1" } else { "1 = 0" });
            return Ok(next);
        }
        let keyword = if negated { "NOT IN" } else { "IN" };
        write!(self.sql, "{} {} (", column, keyword).ok();
        let mut next = next;
        for i in 0..count {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push('?');
            next = self.placeholder(field, next);
        }
        self.sql.push(')');
        Ok(next)
    }

    fn operand(&mut self, operand: &Operand, next: usize) -> Result<usize> {
        match operand {
            Operand::Field(field) => {
                let column = self.column(field)?;
                self.sql.push_str(&column);
                Ok(next)
            }
            Operand::Value { field, .. } | Operand::Accessor { field, .. } => {
                self.sql.push('?');
                Ok(self.placeholder(field, next))
            }
        }
    }

    fn placeholder(&mut self, field: &Field, index: usize) -> usize {
        self.placeholders.push(Placeholder {
            index,
            field: field.clone(),
        });
        index + 1
    }

    /// `TABLE.COLUMN`; a field without a column is always an error here
    fn column(&mut self, field: &Field) -> Result<String> {
        let column =
            self.naming
                .column_name(field)
                .ok_or_else(|| SqlStreamError::UnresolvedColumn {
                    field: field.full_name(),
                })?;
        let table = self.naming.table_name(field.entity());
        let qualified = format!("{}.{}", table, column);
        self.tables.add(table);
        Ok(qualified)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub(crate) fn tables(&self) -> &TableList {
        &self.tables
    }

    pub(crate) fn finish(self) -> (String, Vec<Placeholder>) {
        (self.sql, self.placeholders)
    }
}

/// Placeholders of `constraint` in assignment order, starting at index 1
pub fn compile_index_sequence(
    constraint: &Constraint,
    naming: &dyn NamingResolver,
) -> Result<Vec<Placeholder>> {
    let mut compiler = WhereCompiler::new(naming);
    compiler.compile(constraint, 1)?;
    Ok(compiler.finish().1)
}
