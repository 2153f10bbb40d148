//! Accessors: typed single-value cells used as operands, update values and
//! result column handles.
//!
//! An accessor lives one of three lifecycles:
//!
//! - **Literal**: a fixed value
//! - **Fed**: a value set by the caller before each execution
//! - **Column**: bound at compile time to a 1-based result column, reading
//!   lazily from the live row of the cursor it is attached to

pub mod column;
pub mod typed;

pub use column::ColumnAccessor;
pub use typed::{
    BlobAccessor, BooleanAccessor, DoubleAccessor, IntegerAccessor, LongAccessor, StringAccessor,
};

use crate::error::Result;
use crate::metamodel::Value;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Value cell supplied externally. Clones share the same cell.
#[derive(Clone, Default)]
pub struct FedAccessor {
    value: Arc<Mutex<Value>>,
}

impl FedAccessor {
    pub fn new() -> Self {
        Self {
            value: Arc::new(Mutex::new(Value::Null)),
        }
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        let accessor = Self::new();
        accessor.set(value);
        accessor
    }

    pub fn set(&self, value: impl Into<Value>) {
        *self.value.lock() = value.into();
    }

    pub fn clear(&self) {
        *self.value.lock() = Value::Null;
    }

    pub fn get(&self) -> Value {
        self.value.lock().clone()
    }
}

impl fmt::Debug for FedAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fed({:?})", self.value.lock())
    }
}

#[derive(Clone)]
pub enum Accessor {
    Literal(Value),
    Fed(FedAccessor),
    Column(ColumnAccessor),
}

impl Accessor {
    /// The value this accessor holds right now
    pub fn current_value(&self) -> Result<Value> {
        match self {
            Accessor::Literal(value) => Ok(value.clone()),
            Accessor::Fed(fed) => Ok(fed.get()),
            Accessor::Column(column) => column.read_value(),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Literal(value) => write!(f, "Literal({:?})", value),
            Accessor::Fed(fed) => fmt::Debug::fmt(fed, f),
            Accessor::Column(column) => fmt::Debug::fmt(column, f),
        }
    }
}

impl From<Value> for Accessor {
    fn from(value: Value) -> Self {
        Accessor::Literal(value)
    }
}

impl From<FedAccessor> for Accessor {
    fn from(fed: FedAccessor) -> Self {
        Accessor::Fed(fed)
    }
}

impl From<ColumnAccessor> for Accessor {
    fn from(column: ColumnAccessor) -> Self {
        Accessor::Column(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fed_accessor_shares_cell() -> Result<()> {
        let fed = FedAccessor::new();
        let accessor = Accessor::from(fed.clone());
        assert_eq!(accessor.current_value()?, Value::Null);

        fed.set(42);
        assert_eq!(accessor.current_value()?, Value::Integer(42));

        fed.clear();
        assert!(accessor.current_value()?.is_null());
        Ok(())
    }

    #[test]
    fn test_literal_accessor() -> Result<()> {
        let accessor = Accessor::from(Value::from("fixed"));
        assert_eq!(accessor.current_value()?, Value::String("fixed".to_string()));
        assert_eq!(format!("{:?}", accessor), "Literal(String(\"fixed\"))");
        Ok(())
    }
}
