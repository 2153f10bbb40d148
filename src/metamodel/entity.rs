//! Entity types: named tables owning an ordered set of fields.

use super::field::{
    BlobField, BooleanField, DoubleField, Field, IntegerField, LongField, StringField,
};
use super::value::FieldKind;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct FieldDef {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) is_key: bool,
    pub(crate) db_name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct EntityInner {
    pub(crate) name: String,
    pub(crate) table_name: Option<String>,
    pub(crate) fields: Vec<FieldDef>,
}

/// A named table schema. Cloning is cheap and clones compare equal.
#[derive(Clone)]
pub struct EntityType {
    pub(crate) inner: Arc<EntityInner>,
}

impl EntityType {
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            table_name: None,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Explicit table name, bypassing the naming rules when set
    pub fn table_name(&self) -> Option<&str> {
        self.inner.table_name.as_deref()
    }

    pub fn fields(&self) -> Vec<Field> {
        (0..self.inner.fields.len())
            .map(|index| Field::new(self.clone(), index))
            .collect()
    }

    pub fn key_fields(&self) -> Vec<Field> {
        self.fields().into_iter().filter(Field::is_key).collect()
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.inner
            .fields
            .iter()
            .position(|def| def.name == name)
            .map(|index| Field::new(self.clone(), index))
    }

    pub fn integer_field(&self, name: &str) -> Option<IntegerField> {
        self.field(name).and_then(|f| IntegerField::try_from(f).ok())
    }

    pub fn long_field(&self, name: &str) -> Option<LongField> {
        self.field(name).and_then(|f| LongField::try_from(f).ok())
    }

    pub fn double_field(&self, name: &str) -> Option<DoubleField> {
        self.field(name).and_then(|f| DoubleField::try_from(f).ok())
    }

    pub fn boolean_field(&self, name: &str) -> Option<BooleanField> {
        self.field(name).and_then(|f| BooleanField::try_from(f).ok())
    }

    pub fn string_field(&self, name: &str) -> Option<StringField> {
        self.field(name).and_then(|f| StringField::try_from(f).ok())
    }

    pub fn blob_field(&self, name: &str) -> Option<BlobField> {
        self.field(name).and_then(|f| BlobField::try_from(f).ok())
    }

    pub(crate) fn def(&self, index: usize) -> &FieldDef {
        &self.inner.fields[index]
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EntityType {}

impl std::hash::Hash for EntityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.inner.name)
    }
}

/// Declares the fields of an entity type in order.
pub struct EntityTypeBuilder {
    name: String,
    table_name: Option<String>,
    fields: Vec<FieldDef>,
}

impl EntityTypeBuilder {
    /// Use an explicit table name instead of the derived one
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, false, None)
    }

    pub fn key(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, true, None)
    }

    /// Declare a field stored under an explicit column name
    pub fn field_with_column(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        column: impl Into<String>,
    ) -> Self {
        self.push(name.into(), kind, false, Some(column.into()))
    }

    pub fn build(self) -> EntityType {
        EntityType {
            inner: Arc::new(EntityInner {
                name: self.name,
                table_name: self.table_name,
                fields: self.fields,
            }),
        }
    }

    fn push(mut self, name: String, kind: FieldKind, is_key: bool, db_name: Option<String>) -> Self {
        // Later declarations with the same name replace the earlier one
        self.fields.retain(|def| def.name != name);
        self.fields.push(FieldDef {
            name,
            kind,
            is_key,
            db_name,
        });
        self
    }
}
