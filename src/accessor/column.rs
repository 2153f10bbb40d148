//! Row-bound accessor: a view over the live row of a cursor at a fixed column.

use crate::cursor::{CursorState, SharedCursor};
use crate::error::{Result, SqlStreamError};
use crate::metamodel::{Field, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

struct ColumnSlot {
    /// 1-based result column, set once at compile time
    index: OnceLock<usize>,
    cursor: Mutex<Weak<Mutex<CursorState>>>,
}

/// Handle on one result column. Clones share the same slot.
#[derive(Clone)]
pub struct ColumnAccessor {
    field: Field,
    slot: Arc<ColumnSlot>,
}

impl ColumnAccessor {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            slot: Arc::new(ColumnSlot {
                index: OnceLock::new(),
                cursor: Mutex::new(Weak::new()),
            }),
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Result column this accessor reads, once compiled
    pub fn index(&self) -> Option<usize> {
        self.slot.index.get().copied()
    }

    pub(crate) fn assign_index(&self, index: usize) -> Result<()> {
        let assigned = *self.slot.index.get_or_init(|| index);
        self.check_assigned(assigned, index)
    }

    /// Fails when the accessor already reads another column
    pub(crate) fn check_index(&self, index: usize) -> Result<()> {
        match self.index() {
            Some(assigned) => self.check_assigned(assigned, index),
            None => Ok(()),
        }
    }

    fn check_assigned(&self, assigned: usize, requested: usize) -> Result<()> {
        if assigned == requested {
            Ok(())
        } else {
            Err(SqlStreamError::AccessorRebound {
                field: self.field.full_name(),
                assigned,
                requested,
            })
        }
    }

    pub(crate) fn attach(&self, cursor: &SharedCursor) {
        *self.slot.cursor.lock() = Arc::downgrade(cursor);
    }

    /// Read the current row's value, converted to the field's declared kind
    pub fn read_value(&self) -> Result<Value> {
        let index = self.index().ok_or_else(|| SqlStreamError::UnboundAccessor {
            field: self.field.full_name(),
        })?;
        let cursor = self
            .slot
            .cursor
            .lock()
            .upgrade()
            .ok_or_else(|| SqlStreamError::NoCurrentRow {
                field: self.field.full_name(),
            })?;
        let mut state = cursor.lock();
        state.read(index, &self.field)
    }

    pub fn is_null(&self) -> Result<bool> {
        Ok(self.read_value()?.is_null())
    }
}

impl fmt::Debug for ColumnAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "Column({} @ {})", self.field, index),
            None => write!(f, "Column({} unbound)", self.field),
        }
    }
}
