//! Compile phase: turns field selections, value assignments and constraint
//! trees into SQL text with `?` placeholders.
//!
//! Every traversal threads the next free placeholder index through the walk
//! and returns it, so the placeholder order is fixed by the traversal alone.
//! The binder repeats the same traversal to supply values.

pub mod mutation;
pub mod select;
pub mod where_clause;

pub use mutation::{compile_delete, compile_insert, compile_update, CompiledMutation};
pub use select::{compile_select, CompiledSelect, Direction, Order, SelectRequest};
pub use where_clause::{compile_index_sequence, WhereCompiler};

use crate::error::{Result, SqlStreamError};
use crate::metamodel::Field;
use crate::naming::NamingResolver;

/// Positional parameter assigned during compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// 1-based parameter index
    pub index: usize,
    /// Field whose kind the bound value is coerced to
    pub field: Field,
}

/// Tables in first-reference order
#[derive(Debug, Default, Clone)]
pub(crate) struct TableList {
    tables: Vec<String>,
}

impl TableList {
    pub(crate) fn add(&mut self, table: String) {
        if !self.tables.contains(&table) {
            self.tables.push(table);
        }
    }

    pub(crate) fn join(&self) -> String {
        self.tables.join(", ")
    }

    pub(crate) fn tables(&self) -> &[String] {
        &self.tables
    }
}

/// Resolve a field to its column, honoring the strictness switch.
///
/// `Ok(None)` means the field is skipped.
pub(crate) fn resolve_column(
    naming: &dyn NamingResolver,
    field: &Field,
    strict: bool,
) -> Result<Option<String>> {
    match naming.column_name(field) {
        Some(column) => Ok(Some(column)),
        None if strict => Err(SqlStreamError::UnresolvedColumn {
            field: field.full_name(),
        }),
        None => {
            log::warn!("No column for field {}, skipping it", field.full_name());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::{EntityType, FieldKind};
    use crate::naming::DefaultNaming;

    #[test]
    fn test_table_list_keeps_first_reference_order() {
        let mut tables = TableList::default();
        tables.add("B".to_string());
        tables.add("A".to_string());
        tables.add("B".to_string());
        assert_eq!(tables.join(), "B, A");
        assert_eq!(tables.tables().len(), 2);
    }

    #[test]
    fn test_resolve_column_strictness() {
        let entity = EntityType::builder("Item")
            .field("label", FieldKind::String)
            .build();
        let label = entity.field("label").unwrap();
        let naming = DefaultNaming::default().without_column(&label);

        assert_eq!(resolve_column(&naming, &label, false).unwrap(), None);
        assert!(matches!(
            resolve_column(&naming, &label, true),
            Err(SqlStreamError::UnresolvedColumn { .. })
        ));
        assert_eq!(
            resolve_column(&DefaultNaming::default(), &label, true).unwrap(),
            Some("LABEL".to_string())
        );
    }
}
