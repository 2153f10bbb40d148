//! Connection, prepared statement and row set of the in-memory backend.

use super::ast::{self, Expression, OrderDirection, SelectItem, SelectStatement};
use super::database::MemoryDatabase;
use super::eval::{compare_values, Evaluator, Scope};
use super::parser::Parser;
use crate::driver::{Connection, RowSet, Statement};
use crate::error::{DriverError, DriverResult};
use crate::metamodel::Value;
use std::cmp::Ordering;

/// Connection onto a [`MemoryDatabase`]
#[derive(Clone)]
pub struct MemoryConnection {
    database: MemoryDatabase,
}

impl MemoryConnection {
    pub(crate) fn new(database: MemoryDatabase) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.database
    }

    /// Prepare and run a statement that takes no parameters
    pub fn execute(&self, sql: &str) -> DriverResult<u64> {
        let mut statement = self.prepare_memory(sql)?;
        let count = statement.execute_update()?;
        statement.close()?;
        Ok(count)
    }

    fn prepare_memory(&self, sql: &str) -> DriverResult<MemoryStatement> {
        let mut parser = Parser::new(sql);
        let statement = parser
            .parse()
            .map_err(|e| DriverError::Syntax(format!("{:#}", e)))?;
        let parameter_count = parser.parameter_count();

        // Tables must exist at prepare time, except for the one being created
        let tables: Vec<&str> = match &statement {
            ast::Statement::Select(select) => select.from.iter().map(String::as_str).collect(),
            ast::Statement::Insert(insert) => vec![insert.table_name.as_str()],
            ast::Statement::Update(update) => vec![update.table_name.as_str()],
            ast::Statement::Delete(delete) => vec![delete.table_name.as_str()],
            ast::Statement::CreateTable(_) => vec![],
        };
        for table in tables {
            self.database.table(table)?;
        }

        log::trace!("Prepared {} with {} parameters", sql, parameter_count);
        Ok(MemoryStatement {
            database: self.database.clone(),
            statement,
            parameters: vec![None; parameter_count],
            closed: false,
        })
    }
}

impl Connection for MemoryConnection {
    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn Statement>> {
        Ok(Box::new(self.prepare_memory(sql)?))
    }
}

/// Parsed statement with its positional parameters
pub struct MemoryStatement {
    database: MemoryDatabase,
    statement: ast::Statement,
    parameters: Vec<Option<Value>>,
    closed: bool,
}

impl MemoryStatement {
    fn set(&mut self, index: usize, value: Value) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let count = self.parameters.len();
        match index.checked_sub(1).and_then(|i| self.parameters.get_mut(i)) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(DriverError::ParameterIndex { index, count }),
        }
    }

    /// Parameters in order; every slot must have been set
    fn bound_parameters(&self) -> DriverResult<Vec<Value>> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, value)| value.clone().ok_or(DriverError::MissingParameter(i + 1)))
            .collect()
    }

    fn run_select(&self, select: &SelectStatement, parameters: &[Value]) -> DriverResult<MemoryRowSet> {
        let mut scope = Scope::new();
        let mut joined: Vec<Vec<Value>> = vec![Vec::new()];

        // Cross product of every table in FROM
        for name in &select.from {
            let table = self.database.table(name)?;
            let table = table.read();
            scope.push(table.name(), table.column_names());

            let mut next = Vec::with_capacity(joined.len() * table.len());
            for prefix in &joined {
                for row in table.rows() {
                    let mut combined = prefix.clone();
                    combined.extend(row.iter().cloned());
                    next.push(combined);
                }
            }
            joined = next;
        }

        let evaluator = Evaluator::new(&scope, parameters);

        if let Some(predicate) = &select.where_clause {
            let mut kept = Vec::with_capacity(joined.len());
            for row in joined {
                if evaluator.matches(predicate, &row)? {
                    kept.push(row);
                }
            }
            joined = kept;
        }

        if !select.order_by.is_empty() {
            let mut keyed = Vec::with_capacity(joined.len());
            for row in joined {
                let keys = select
                    .order_by
                    .iter()
                    .map(|item| evaluator.evaluate(order_expression(select, &item.expression), &row))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                keyed.push((keys, row));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                for ((v1, v2), item) in a.iter().zip(b.iter()).zip(&select.order_by) {
                    let cmp = compare_values(v1, v2);
                    let cmp = match item.direction {
                        OrderDirection::Asc => cmp,
                        OrderDirection::Desc => cmp.reverse(),
                    };
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            });
            joined = keyed.into_iter().map(|(_, row)| row).collect();
        }

        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(joined.len());
        for row in &joined {
            if select.limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let mut projected = Vec::new();
            for item in &select.projections {
                match item {
                    SelectItem::AllColumns => projected.extend(row.iter().cloned()),
                    SelectItem::Expression(expr) => projected.push(evaluator.evaluate(expr, row)?),
                }
            }
            if select.distinct && rows.contains(&projected) {
                continue;
            }
            rows.push(projected);
        }

        let columns = self.result_columns()?;
        log::trace!("Query returned {} rows", rows.len());
        Ok(MemoryRowSet::new(columns, rows))
    }

    fn run_insert(&self, insert: &ast::InsertStatement, parameters: &[Value]) -> DriverResult<u64> {
        let table = self.database.table(&insert.table_name)?;
        let mut table = table.write();

        let targets: Vec<usize> = match &insert.columns {
            Some(columns) => columns
                .iter()
                .map(|c| {
                    table
                        .column_index(c)
                        .ok_or_else(|| DriverError::UnknownColumn(c.clone()))
                })
                .collect::<DriverResult<_>>()?,
            None => (0..table.columns().len()).collect(),
        };

        let scope = Scope::new();
        let evaluator = Evaluator::new(&scope, parameters);
        let mut pending = Vec::with_capacity(insert.values.len());
        for values in &insert.values {
            if values.len() != targets.len() {
                return Err(DriverError::Other(format!(
                    "INSERT has {} columns but {} values",
                    targets.len(),
                    values.len()
                )));
            }
            let mut assigned = Vec::with_capacity(values.len());
            for (target, expr) in targets.iter().zip(values) {
                assigned.push((*target, evaluator.evaluate(expr, &[])?));
            }
            pending.push(assigned);
        }

        let count = pending.len() as u64;
        for assigned in pending {
            table.insert(assigned)?;
        }
        Ok(count)
    }

    fn run_update(&self, update: &ast::UpdateStatement, parameters: &[Value]) -> DriverResult<u64> {
        let table = self.database.table(&update.table_name)?;
        let mut table = table.write();

        let mut scope = Scope::new();
        scope.push(table.name(), table.column_names());
        let evaluator = Evaluator::new(&scope, parameters);

        let targets: Vec<usize> = update
            .assignments
            .iter()
            .map(|a| {
                table
                    .column_index(&a.column)
                    .ok_or_else(|| DriverError::UnknownColumn(a.column.clone()))
            })
            .collect::<DriverResult<_>>()?;

        // Compute every change before applying any
        let mut changes = Vec::new();
        for (position, row) in table.rows().iter().enumerate() {
            if let Some(predicate) = &update.where_clause {
                if !evaluator.matches(predicate, row)? {
                    continue;
                }
            }
            let mut values = Vec::with_capacity(targets.len());
            for (target, assignment) in targets.iter().zip(&update.assignments) {
                let value = evaluator.evaluate(&assignment.value, row)?;
                values.push((*target, table.normalize(*target, value)?));
            }
            changes.push((position, values));
        }

        let count = changes.len() as u64;
        let rows = table.rows_mut();
        for (position, values) in changes {
            for (target, value) in values {
                rows[position][target] = value;
            }
        }
        Ok(count)
    }

    fn run_delete(&self, delete: &ast::DeleteStatement, parameters: &[Value]) -> DriverResult<u64> {
        let table = self.database.table(&delete.table_name)?;
        let mut table = table.write();

        let Some(predicate) = &delete.where_clause else {
            let count = table.len() as u64;
            table.rows_mut().clear();
            return Ok(count);
        };

        let mut scope = Scope::new();
        scope.push(table.name(), table.column_names());
        let evaluator = Evaluator::new(&scope, parameters);

        let mut keep = Vec::with_capacity(table.len());
        for row in table.rows() {
            keep.push(!evaluator.matches(predicate, row)?);
        }

        let before = table.len();
        let mut flags = keep.into_iter();
        table.rows_mut().retain(|_| flags.next().unwrap_or(true));
        Ok((before - table.len()) as u64)
    }
}

/// ORDER BY may name a selected column without its table
fn order_expression<'a>(select: &'a SelectStatement, expression: &'a Expression) -> &'a Expression {
    let Expression::Column(name) = expression else {
        return expression;
    };
    select
        .projections
        .iter()
        .find_map(|item| match item {
            SelectItem::Expression(projected @ Expression::QualifiedColumn(_, column))
                if column.eq_ignore_ascii_case(name) =>
            {
                Some(projected)
            }
            _ => None,
        })
        .unwrap_or(expression)
}

impl Statement for MemoryStatement {
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()> {
        self.set(index, Value::Integer(value))
    }

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()> {
        self.set(index, Value::Long(value))
    }

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()> {
        self.set(index, Value::Double(value))
    }

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()> {
        self.set(index, Value::Boolean(value))
    }

    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()> {
        self.set(index, Value::String(value.to_string()))
    }

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()> {
        self.set(index, Value::Blob(value.to_vec()))
    }

    fn result_columns(&self) -> DriverResult<Vec<String>> {
        let mut missing = None;
        let columns = self.statement.result_columns(|table| {
            match self.database.table(table) {
                Ok(table) => table.read().column_names(),
                Err(e) => {
                    missing = Some(e);
                    Vec::new()
                }
            }
        });
        match missing {
            Some(e) => Err(e),
            None => Ok(columns),
        }
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn RowSet>> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let ast::Statement::Select(select) = &self.statement else {
            return Err(DriverError::Other(
                "Statement does not return rows".to_string(),
            ));
        };
        let parameters = self.bound_parameters()?;
        Ok(Box::new(self.run_select(select, &parameters)?))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let parameters = self.bound_parameters()?;
        let count = match &self.statement {
            ast::Statement::Insert(insert) => self.run_insert(insert, &parameters)?,
            ast::Statement::Update(update) => self.run_update(update, &parameters)?,
            ast::Statement::Delete(delete) => self.run_delete(delete, &parameters)?,
            ast::Statement::CreateTable(create) => {
                self.database
                    .create_table(&create.table_name, create.columns.clone())?;
                0
            }
            ast::Statement::Select(_) => {
                return Err(DriverError::Other(
                    "Query statements must use execute_query".to_string(),
                ))
            }
        };
        log::trace!("Update affected {} rows", count);
        Ok(count)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.parameters.clear();
        Ok(())
    }
}

/// Materialized query result
pub struct MemoryRowSet {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
    current: Option<Vec<Value>>,
    was_null: bool,
    closed: bool,
}

impl MemoryRowSet {
    fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
            was_null: false,
            closed: false,
        }
    }

    fn value(&mut self, index: usize) -> DriverResult<Value> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let row = self.current.as_ref().ok_or(DriverError::NoRow)?;
        let value = index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .cloned()
            .ok_or(DriverError::ColumnIndex {
                index,
                width: row.len(),
            })?;
        self.was_null = value.is_null();
        Ok(value)
    }
}

impl RowSet for MemoryRowSet {
    fn next(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn get_object(&mut self, index: usize) -> DriverResult<Value> {
        self.value(index)
    }

    fn get_double(&mut self, index: usize) -> DriverResult<f64> {
        match self.value(index)? {
            Value::Null => Ok(0.0),
            Value::Double(v) => Ok(v),
            Value::Integer(v) => Ok(f64::from(v)),
            Value::Long(v) => Ok(v as f64),
            other => Err(DriverError::Conversion {
                expected: "double",
                actual: other.type_name().to_string(),
            }),
        }
    }

    fn get_boolean(&mut self, index: usize) -> DriverResult<bool> {
        match self.value(index)? {
            Value::Null => Ok(false),
            Value::Boolean(v) => Ok(v),
            other => Err(DriverError::Conversion {
                expected: "boolean",
                actual: other.type_name().to_string(),
            }),
        }
    }

    fn get_bytes(&mut self, index: usize) -> DriverResult<Option<Vec<u8>>> {
        match self.value(index)? {
            Value::Null => Ok(None),
            Value::Blob(v) => Ok(Some(v)),
            other => Err(DriverError::Conversion {
                expected: "blob",
                actual: other.type_name().to_string(),
            }),
        }
    }

    fn was_null(&self) -> bool {
        self.was_null
    }

    fn column_name(&self, index: usize) -> Option<String> {
        index
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .cloned()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> MemoryConnection {
        let connection = MemoryDatabase::new().connection();
        connection
            .execute("CREATE TABLE PERSON (ID INTEGER, NAME VARCHAR, SCORE DOUBLE)")
            .unwrap();
        connection
            .execute(
                "INSERT INTO PERSON (ID, NAME, SCORE) VALUES \
                 (1, 'ann', 1.5), (2, 'bob', NULL), (3, NULL, 0.0)",
            )
            .unwrap();
        connection
    }

    fn read_all(rows: &mut dyn RowSet, width: usize) -> Vec<Vec<Value>> {
        let mut result = Vec::new();
        while rows.next().unwrap() {
            result.push((1..=width).map(|i| rows.get_object(i).unwrap()).collect());
        }
        result
    }

    #[test]
    fn test_select_with_parameters() {
        let connection = people();
        let mut statement = connection
            .prepare("SELECT PERSON.ID, PERSON.NAME FROM PERSON WHERE PERSON.ID IN (?, ?) ORDER BY ID DESC")
            .unwrap();
        assert_eq!(
            statement.result_columns().unwrap(),
            vec!["ID".to_string(), "NAME".to_string()]
        );
        statement.set_long(1, 1).unwrap();
        statement.set_int(2, 3).unwrap();

        let mut rows = statement.execute_query().unwrap();
        assert_eq!(
            read_all(rows.as_mut(), 2),
            vec![
                vec![Value::Integer(3), Value::Null],
                vec![Value::Integer(1), Value::String("ann".to_string())],
            ]
        );
    }

    #[test]
    fn test_parameter_errors() {
        let connection = people();
        let mut statement = connection
            .prepare("SELECT PERSON.ID FROM PERSON WHERE PERSON.ID = ?")
            .unwrap();
        assert!(matches!(
            statement.set_int(2, 1),
            Err(DriverError::ParameterIndex { index: 2, count: 1 })
        ));
        assert!(matches!(
            statement.execute_query(),
            Err(DriverError::MissingParameter(1))
        ));
        statement.close().unwrap();
        assert!(matches!(statement.set_int(1, 1), Err(DriverError::Closed)));
    }

    #[test]
    fn test_prepare_errors() {
        let connection = people();
        assert!(matches!(
            connection.prepare("SELECT X FROM NOWHERE"),
            Err(DriverError::UnknownTable(_))
        ));
        assert!(matches!(
            connection.prepare("SELECT FROM"),
            Err(DriverError::Syntax(_))
        ));
    }

    #[test]
    fn test_double_null_probe() {
        let connection = people();
        let mut statement = connection
            .prepare("SELECT PERSON.SCORE FROM PERSON ORDER BY ID ASC")
            .unwrap();
        let mut rows = statement.execute_query().unwrap();

        assert!(rows.next().unwrap());
        assert_eq!(rows.get_double(1).unwrap(), 1.5);
        assert!(!rows.was_null());

        assert!(rows.next().unwrap());
        assert_eq!(rows.get_double(1).unwrap(), 0.0);
        assert!(rows.was_null());

        assert!(rows.next().unwrap());
        assert_eq!(rows.get_double(1).unwrap(), 0.0);
        assert!(!rows.was_null());

        assert!(!rows.next().unwrap());
        assert!(matches!(rows.get_double(1), Err(DriverError::NoRow)));
    }

    #[test]
    fn test_update_and_delete() {
        let connection = people();
        let mut update = connection
            .prepare("UPDATE PERSON SET NAME = ? WHERE PERSON.NAME IS NULL")
            .unwrap();
        update.set_string(1, "cid").unwrap();
        assert_eq!(update.execute_update().unwrap(), 1);

        let mut delete = connection
            .prepare("DELETE FROM PERSON WHERE PERSON.NAME LIKE ?")
            .unwrap();
        delete.set_string(1, "%b%").unwrap();
        assert_eq!(delete.execute_update().unwrap(), 1);
        assert_eq!(connection.database().row_count("PERSON").unwrap(), 2);

        assert_eq!(connection.execute("DELETE FROM PERSON WHERE 1 = 0").unwrap(), 0);
        assert_eq!(connection.execute("DELETE FROM PERSON").unwrap(), 2);
    }

    #[test]
    fn test_distinct_limit_and_star() {
        let connection = people();
        connection
            .execute("INSERT INTO PERSON (ID, NAME) VALUES (4, 'ann')")
            .unwrap();

        let mut statement = connection
            .prepare("SELECT DISTINCT PERSON.NAME FROM PERSON WHERE PERSON.NAME IS NOT NULL ORDER BY NAME")
            .unwrap();
        let mut rows = statement.execute_query().unwrap();
        assert_eq!(
            read_all(rows.as_mut(), 1),
            vec![
                vec![Value::String("ann".to_string())],
                vec![Value::String("bob".to_string())],
            ]
        );

        let mut statement = connection
            .prepare("SELECT * FROM PERSON LIMIT 2")
            .unwrap();
        assert_eq!(statement.result_columns().unwrap().len(), 3);
        let mut rows = statement.execute_query().unwrap();
        assert_eq!(read_all(rows.as_mut(), 3).len(), 2);
    }

    #[test]
    fn test_join() {
        let connection = people();
        connection
            .execute("CREATE TABLE ADDRESS (PERSON_ID INTEGER, CITY VARCHAR)")
            .unwrap();
        connection
            .execute("INSERT INTO ADDRESS VALUES (1, 'Paris'), (2, 'Lyon')")
            .unwrap();

        let mut statement = connection
            .prepare(
                "SELECT PERSON.NAME, ADDRESS.CITY FROM PERSON, ADDRESS \
                 WHERE (PERSON.ID = ADDRESS.PERSON_ID AND ADDRESS.CITY = ?)",
            )
            .unwrap();
        statement.set_string(1, "Lyon").unwrap();
        let mut rows = statement.execute_query().unwrap();
        assert_eq!(
            read_all(rows.as_mut(), 2),
            vec![vec![
                Value::String("bob".to_string()),
                Value::String("Lyon".to_string())
            ]]
        );
    }

    #[test]
    fn test_rowset_close() {
        let connection = people();
        let mut statement = connection.prepare("SELECT * FROM PERSON").unwrap();
        let mut rows = statement.execute_query().unwrap();
        assert!(rows.next().unwrap());
        rows.close().unwrap();
        assert!(matches!(rows.next(), Err(DriverError::Closed)));
        assert_eq!(rows.column_name(2), Some("NAME".to_string()));
    }
}
