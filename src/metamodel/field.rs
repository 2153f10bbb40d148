//! Field descriptors and their typed handles.

use super::entity::EntityType;
use super::value::{FieldKind, Value};
use crate::error::SqlStreamError;
use std::fmt;
use std::ops::Deref;

/// A typed column descriptor owned by one entity type.
///
/// Fields are compared by identity: two fields are equal only when they
/// were declared by the same entity type instance at the same position.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Field {
    entity: EntityType,
    index: usize,
}

impl Field {
    pub(crate) fn new(entity: EntityType, index: usize) -> Self {
        Self { entity, index }
    }

    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn name(&self) -> &str {
        &self.entity.def(self.index).name
    }

    pub fn kind(&self) -> FieldKind {
        self.entity.def(self.index).kind
    }

    pub fn is_key(&self) -> bool {
        self.entity.def(self.index).is_key
    }

    /// Explicit column name declared on the field, if any
    pub fn db_name(&self) -> Option<&str> {
        self.entity.def(self.index).db_name.as_deref()
    }

    /// Position of the field within its entity type
    pub fn index(&self) -> usize {
        self.index
    }

    /// `Entity.field`, used in diagnostics
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.entity.name(), self.name())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.full_name(), self.kind())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A field handle whose value kind is known statically.
pub trait TypedField {
    /// Rust type of the values stored in the field
    type Native: Into<Value>;

    fn as_field(&self) -> &Field;
}

macro_rules! typed_field {
    ($(#[$doc:meta])* $name:ident, $kind:ident, $native:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Field);

        impl $name {
            pub fn field(&self) -> &Field {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Field;

            fn deref(&self) -> &Field {
                &self.0
            }
        }

        impl TryFrom<Field> for $name {
            type Error = SqlStreamError;

            fn try_from(field: Field) -> Result<Self, Self::Error> {
                if field.kind() == FieldKind::$kind {
                    Ok($name(field))
                } else {
                    Err(SqlStreamError::KindMismatch {
                        field: field.full_name(),
                        expected: FieldKind::$kind.as_str(),
                        actual: field.kind().to_string(),
                    })
                }
            }
        }

        impl From<$name> for Field {
            fn from(typed: $name) -> Field {
                typed.0
            }
        }

        impl TypedField for $name {
            type Native = $native;

            fn as_field(&self) -> &Field {
                &self.0
            }
        }
    };
}

typed_field!(
    /// Handle on a 32-bit integer field
    IntegerField,
    Integer,
    i32
);
typed_field!(LongField, Long, i64);
typed_field!(DoubleField, Double, f64);
typed_field!(BooleanField, Boolean, bool);
typed_field!(StringField, String, String);
typed_field!(
    /// Handle on a binary field
    BlobField,
    Blob,
    Vec<u8>
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_conversion() {
        let item = EntityType::builder("Item")
            .key("id", FieldKind::Long)
            .field("label", FieldKind::String)
            .build();

        let id = item.field("id").unwrap();
        let long = LongField::try_from(id.clone()).unwrap();
        assert_eq!(long.field(), &id);
        assert_eq!(long.name(), "id");

        let err = IntegerField::try_from(id).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field Item.id is declared integer but got long"
        );
    }

    #[test]
    fn test_debug_format() {
        let item = EntityType::builder("Item")
            .field("label", FieldKind::String)
            .build();
        let label = item.field("label").unwrap();
        assert_eq!(format!("{:?}", label), "Item.label:string");
        assert_eq!(label.to_string(), "Item.label");
    }
}
