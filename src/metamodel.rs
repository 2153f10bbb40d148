//! Metamodel consumed by the query layer.
//!
//! - **EntityType**: a named table owning ordered fields, some of them keys
//! - **Field**: a typed column descriptor compared by identity
//! - **Value**: literals, parameters and raw column values

pub mod entity;
pub mod field;
pub mod value;

pub use entity::{EntityType, EntityTypeBuilder};
pub use field::{
    BlobField, BooleanField, DoubleField, Field, IntegerField, LongField, StringField,
    TypedField,
};
pub use value::{FieldKind, Value};
