//! Backend boundary.
//!
//! The query layer talks to a backend through three narrow traits:
//!
//! - **Connection**: prepares parameterized statements
//! - **Statement**: typed positional setters and execution
//! - **RowSet**: forward-only row sequence with typed getters and a was-null probe
//!
//! Parameter and column indexes are 1-based on both sides of the boundary.

pub mod memory;

use crate::error::DriverResult;
use crate::metamodel::Value;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;

pub trait Connection: Send + Sync {
    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn Statement>>;
}

pub trait Statement: Send {
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()>;

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()>;

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()>;

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()>;

    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()>;

    fn set_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()>;

    /// Stream `length` bytes from `reader` into a binary parameter
    fn set_binary_stream(
        &mut self,
        index: usize,
        length: usize,
        reader: &mut dyn Read,
    ) -> DriverResult<()> {
        let mut data = vec![0u8; length];
        reader.read_exact(&mut data)?;
        self.set_bytes(index, &data)
    }

    /// Column names of the result, in result order
    fn result_columns(&self) -> DriverResult<Vec<String>>;

    fn execute_query(&mut self) -> DriverResult<Box<dyn RowSet>>;

    /// Run a mutation and return the number of affected rows
    fn execute_update(&mut self) -> DriverResult<u64>;

    fn close(&mut self) -> DriverResult<()>;
}

pub trait RowSet: Send {
    /// Move to the next row; `false` once the rows are exhausted
    fn next(&mut self) -> DriverResult<bool>;

    fn get_object(&mut self, index: usize) -> DriverResult<Value>;

    /// `0.0` when the column is NULL; check [`RowSet::was_null`]
    fn get_double(&mut self, index: usize) -> DriverResult<f64>;

    /// `false` when the column is NULL; check [`RowSet::was_null`]
    fn get_boolean(&mut self, index: usize) -> DriverResult<bool>;

    fn get_bytes(&mut self, index: usize) -> DriverResult<Option<Vec<u8>>>;

    /// Whether the last column read was NULL
    fn was_null(&self) -> bool;

    fn column_name(&self, index: usize) -> Option<String>;

    fn close(&mut self) -> DriverResult<()>;
}

/// Prepared statement shared between a request and the cursors it opens.
#[derive(Clone)]
pub(crate) struct SharedStatement {
    inner: Arc<Mutex<Option<Box<dyn Statement>>>>,
}

impl SharedStatement {
    pub(crate) fn new(statement: Box<dyn Statement>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(statement))),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Run `f` against the open statement; `None` once closed
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut dyn Statement) -> T) -> Option<T> {
        let mut guard = self.inner.lock();
        let statement = guard.as_mut()?;
        Some(f(&mut **statement))
    }

    /// Close the statement; later calls do nothing
    pub(crate) fn close(&self) -> DriverResult<()> {
        let taken = self.inner.lock().take();
        match taken {
            Some(mut statement) => statement.close(),
            None => Ok(()),
        }
    }
}
