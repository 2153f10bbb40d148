//! Typed result column handles returned by `retrieve_*` on the select builder.

use super::column::ColumnAccessor;
use super::Accessor;
use crate::error::{Result, SqlStreamError};
use crate::metamodel::Value;

macro_rules! typed_accessor {
    ($name:ident, $native:ty, $variant:ident) => {
        #[derive(Debug, Clone)]
        pub struct $name(ColumnAccessor);

        impl $name {
            pub(crate) fn new(column: ColumnAccessor) -> Self {
                Self(column)
            }

            /// Value of the current row; `None` when the column is NULL
            pub fn get(&self) -> Result<Option<$native>> {
                match self.0.read_value()? {
                    Value::Null => Ok(None),
                    Value::$variant(v) => Ok(Some(v)),
                    other => Err(SqlStreamError::KindMismatch {
                        field: self.0.field().full_name(),
                        expected: stringify!($variant),
                        actual: other.type_name().to_string(),
                    }),
                }
            }

            pub fn column(&self) -> &ColumnAccessor {
                &self.0
            }
        }

        impl From<$name> for Accessor {
            fn from(typed: $name) -> Accessor {
                Accessor::Column(typed.0)
            }
        }
    };
}

typed_accessor!(IntegerAccessor, i32, Integer);
typed_accessor!(LongAccessor, i64, Long);
typed_accessor!(DoubleAccessor, f64, Double);
typed_accessor!(BooleanAccessor, bool, Boolean);
typed_accessor!(StringAccessor, String, String);
typed_accessor!(BlobAccessor, Vec<u8>, Blob);
