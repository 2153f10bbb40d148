//! Table registry shared by every connection of an in-memory database.

use super::statement::MemoryConnection;
use super::table::{ColumnDef, ColumnType, MemoryTable};
use crate::error::{DriverError, DriverResult};
use crate::metamodel::EntityType;
use crate::naming::NamingResolver;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) type TableRef = Arc<RwLock<MemoryTable>>;

/// In-memory relational database.
///
/// Cloning yields another handle onto the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<DashMap<String, TableRef>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection onto this database
    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection::new(self.clone())
    }

    /// Create a table; names are stored upper-cased
    pub fn create_table(&self, name: &str, columns: Vec<(String, ColumnType)>) -> DriverResult<()> {
        let key = name.to_uppercase();
        if columns.is_empty() {
            return Err(DriverError::Other(format!("Table {} has no columns", key)));
        }

        match self.tables.entry(key.clone()) {
            Entry::Occupied(_) => Err(DriverError::Other(format!("Table {} already exists", key))),
            Entry::Vacant(slot) => {
                let columns = columns
                    .into_iter()
                    .map(|(name, column_type)| ColumnDef { name, column_type })
                    .collect();
                log::debug!("Creating table {}", key);
                slot.insert(Arc::new(RwLock::new(MemoryTable::new(key, columns))));
                Ok(())
            }
        }
    }

    /// Create the table backing an entity, one column per mapped field
    pub fn create_table_for(
        &self,
        entity: &EntityType,
        naming: &dyn NamingResolver,
    ) -> DriverResult<()> {
        let columns = entity
            .fields()
            .iter()
            .filter_map(|field| {
                naming
                    .column_name(field)
                    .map(|column| (column, ColumnType::for_kind(field.kind())))
            })
            .collect();
        self.create_table(&naming.table_name(entity), columns)
    }

    pub fn drop_table(&self, name: &str) -> DriverResult<()> {
        self.tables
            .remove(&name.to_uppercase())
            .map(|_| ())
            .ok_or_else(|| DriverError::UnknownTable(name.to_string()))
    }

    pub(crate) fn table(&self, name: &str) -> DriverResult<TableRef> {
        self.tables
            .get(&name.to_uppercase())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DriverError::UnknownTable(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_uppercase())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn row_count(&self, name: &str) -> DriverResult<usize> {
        Ok(self.table(name)?.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::FieldKind;
    use crate::naming::DefaultNaming;

    #[test]
    fn test_create_and_drop() {
        let db = MemoryDatabase::new();
        db.create_table("items", vec![("ID".to_string(), ColumnType::Integer)])
            .unwrap();

        assert!(db.has_table("ITEMS"));
        assert_eq!(db.row_count("Items").unwrap(), 0);
        assert!(db
            .create_table("ITEMS", vec![("ID".to_string(), ColumnType::Integer)])
            .is_err());

        db.drop_table("items").unwrap();
        assert!(matches!(
            db.row_count("items"),
            Err(DriverError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_create_table_for_entity() {
        let entity = EntityType::builder("orderLine")
            .key("id", FieldKind::Long)
            .field("count", FieldKind::Integer)
            .field("note", FieldKind::String)
            .build();
        let naming = DefaultNaming::default();
        let db = MemoryDatabase::new();
        db.create_table_for(&entity, &naming).unwrap();

        assert_eq!(db.table_names(), vec!["ORDER_LINE".to_string()]);
        let table = db.table("ORDER_LINE").unwrap();
        assert_eq!(
            table.read().column_names(),
            vec!["ID".to_string(), "_COUNT_".to_string(), "NOTE".to_string()]
        );
    }

    #[test]
    fn test_handles_share_tables() {
        let db = MemoryDatabase::new();
        let other = db.clone();
        db.create_table("T", vec![("A".to_string(), ColumnType::Varchar)])
            .unwrap();
        assert!(other.has_table("t"));
    }
}
