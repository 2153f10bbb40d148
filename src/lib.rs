//! Typed query layer over relational backends.
//!
//! Constraints over entity fields compile to parameterized SQL, bind against
//! a prepared statement in placeholder order, and stream results through a
//! row cursor whose accessors read the live row lazily.

pub mod accessor;
pub mod binder;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod constraint;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod metamodel;
pub mod naming;
pub mod record;
pub mod session;

pub use accessor::{Accessor, ColumnAccessor, FedAccessor};
pub use builder::{
    BulkRequest, CreateBuilder, MutationRequest, SelectBuilder, SelectQuery, SqlRequest,
    UpdateBuilder,
};
pub use config::{BlobMode, SqlStreamsConfig};
pub use constraint::{CompareOp, Constraint};
pub use cursor::{CursorPhase, RowCursor};
pub use error::{DriverError, Result, SqlStreamError};
pub use metamodel::{EntityType, Field, FieldKind, Value};
pub use record::Record;
pub use session::SqlSession;
