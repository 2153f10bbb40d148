//! INSERT, UPDATE and DELETE compilation.

use super::where_clause::WhereCompiler;
use super::{resolve_column, Placeholder};
use crate::accessor::Accessor;
use crate::constraint::Constraint;
use crate::error::{Result, SqlStreamError};
use crate::metamodel::{EntityType, Field};
use crate::naming::NamingResolver;
use std::fmt::Write;

/// Compiled mutation. `values` holds the assignments that received a
/// placeholder, in parameter order, followed by the placeholders of the
/// constraint.
#[derive(Debug, Clone)]
pub struct CompiledMutation {
    pub sql: String,
    pub values: Vec<(Field, Accessor)>,
    pub constraint: Option<Constraint>,
    pub placeholders: Vec<Placeholder>,
}

impl CompiledMutation {
    pub fn parameter_count(&self) -> usize {
        self.placeholders.len()
    }
}

/// Resolve the assigned columns; returns `(column, field, accessor)` per kept value
fn assignments(
    values: &[(Field, Accessor)],
    naming: &dyn NamingResolver,
    strict: bool,
) -> Result<Vec<(String, Field, Accessor)>> {
    let mut resolved = Vec::with_capacity(values.len());
    for (field, accessor) in values {
        if let Some(column) = resolve_column(naming, field, strict)? {
            resolved.push((column, field.clone(), accessor.clone()));
        }
    }
    if resolved.is_empty() {
        return Err(SqlStreamError::EmptySelection);
    }
    Ok(resolved)
}

fn placeholders_for(values: &[(String, Field, Accessor)]) -> Vec<Placeholder> {
    values
        .iter()
        .enumerate()
        .map(|(i, (_, field, _))| Placeholder {
            index: i + 1,
            field: field.clone(),
        })
        .collect()
}

/// `INSERT INTO T (c, ...) VALUES (?, ...)`
pub fn compile_insert(
    entity: &EntityType,
    values: &[(Field, Accessor)],
    naming: &dyn NamingResolver,
    strict: bool,
) -> Result<CompiledMutation> {
    let resolved = assignments(values, naming, strict)?;
    let columns: Vec<&str> = resolved.iter().map(|(c, _, _)| c.as_str()).collect();
    let params = vec!["?"; resolved.len()];
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        naming.table_name(entity),
        columns.join(", "),
        params.join(", ")
    );
    log::debug!("Compiled insert: {}", sql);
    Ok(CompiledMutation {
        sql,
        placeholders: placeholders_for(&resolved),
        values: resolved.into_iter().map(|(_, f, a)| (f, a)).collect(),
        constraint: None,
    })
}

/// `UPDATE T SET c = ?, ... [WHERE ...]`; WHERE placeholders follow the SET ones
pub fn compile_update(
    entity: &EntityType,
    values: &[(Field, Accessor)],
    constraint: Option<&Constraint>,
    naming: &dyn NamingResolver,
    strict: bool,
) -> Result<CompiledMutation> {
    let resolved = assignments(values, naming, strict)?;
    let sets: Vec<String> = resolved
        .iter()
        .map(|(column, _, _)| format!("{} = ?", column))
        .collect();
    let mut sql = format!("UPDATE {} SET {}", naming.table_name(entity), sets.join(", "));
    let mut placeholders = placeholders_for(&resolved);

    if let Some(constraint) = constraint {
        let mut compiler = WhereCompiler::new(naming);
        compiler.compile(constraint, placeholders.len() + 1)?;
        let (predicate, assigned) = compiler.finish();
        write!(sql, " WHERE {}", predicate).ok();
        placeholders.extend(assigned);
    }

    log::debug!("Compiled update: {}", sql);
    Ok(CompiledMutation {
        sql,
        placeholders,
        values: resolved.into_iter().map(|(_, f, a)| (f, a)).collect(),
        constraint: constraint.cloned(),
    })
}

/// `DELETE FROM T [WHERE ...]`
pub fn compile_delete(
    entity: &EntityType,
    constraint: Option<&Constraint>,
    naming: &dyn NamingResolver,
) -> Result<CompiledMutation> {
    let mut sql = format!("DELETE FROM {}", naming.table_name(entity));
    let mut placeholders = Vec::new();
    if let Some(constraint) = constraint {
        let mut compiler = WhereCompiler::new(naming);
        compiler.compile(constraint, 1)?;
        let (predicate, assigned) = compiler.finish();
        write!(sql, " WHERE {}", predicate).ok();
        placeholders = assigned;
    }

    log::debug!("Compiled delete: {}", sql);
    Ok(CompiledMutation {
        sql,
        values: Vec::new(),
        constraint: constraint.cloned(),
        placeholders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FedAccessor;
    use crate::metamodel::{FieldKind, Value};
    use crate::naming::DefaultNaming;

    fn person() -> EntityType {
        EntityType::builder("Person")
            .key("id", FieldKind::Integer)
            .field("firstName", FieldKind::String)
            .field("age", FieldKind::Integer)
            .build()
    }

    #[test]
    fn test_insert() -> Result<()> {
        let entity = person();
        let values = vec![
            (entity.field("id").unwrap(), Accessor::Literal(Value::Integer(1))),
            (
                entity.field("firstName").unwrap(),
                Accessor::from(FedAccessor::with_value("ann")),
            ),
        ];
        let compiled = compile_insert(&entity, &values, &DefaultNaming::default(), false)?;
        assert_eq!(
            compiled.sql,
            "INSERT INTO PERSON (ID, FIRST_NAME) VALUES (?, ?)"
        );
        assert_eq!(compiled.parameter_count(), 2);
        Ok(())
    }

    #[test]
    fn test_update_continues_indexes_into_where() -> Result<()> {
        let entity = person();
        let age = entity.integer_field("age").unwrap();
        let values = vec![
            (age.field().clone(), Accessor::Literal(Value::Integer(31))),
            (
                entity.field("firstName").unwrap(),
                Accessor::Literal(Value::from("bob")),
            ),
        ];
        let constraint = Constraint::or(
            Constraint::equal(&age, 30),
            Constraint::in_values(&age, [40, 50]),
        );
        let compiled = compile_update(
            &entity,
            &values,
            Some(&constraint),
            &DefaultNaming::default(),
            false,
        )?;
        assert_eq!(
            compiled.sql,
            "UPDATE PERSON SET AGE = ?, FIRST_NAME = ? \
             WHERE (PERSON.AGE = ? OR PERSON.AGE IN (?, ?))"
        );
        let indexes: Vec<usize> = compiled.placeholders.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_update_skips_unmapped_assignment() -> Result<()> {
        let entity = person();
        let name = entity.field("firstName").unwrap();
        let naming = DefaultNaming::default().without_column(&name);
        let values = vec![
            (name, Accessor::Literal(Value::from("bob"))),
            (entity.field("age").unwrap(), Accessor::Literal(Value::Integer(2))),
        ];
        let compiled = compile_update(&entity, &values, None, &naming, false)?;
        assert_eq!(compiled.sql, "UPDATE PERSON SET AGE = ?");
        assert_eq!(compiled.values.len(), 1);
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let entity = person();
        let naming = DefaultNaming::default();
        assert_eq!(
            compile_delete(&entity, None, &naming)?.sql,
            "DELETE FROM PERSON"
        );
        let constraint = Constraint::is_null(&entity.field("firstName").unwrap());
        let compiled = compile_delete(&entity, Some(&constraint), &naming)?;
        assert_eq!(
            compiled.sql,
            "DELETE FROM PERSON WHERE PERSON.FIRST_NAME IS NULL"
        );
        assert_eq!(compiled.parameter_count(), 0);
        Ok(())
    }

    #[test]
    fn test_insert_without_values() {
        let entity = person();
        assert!(matches!(
            compile_insert(&entity, &[], &DefaultNaming::default(), false),
            Err(SqlStreamError::EmptySelection)
        ));
    }
}
