//! Resolution of entity and field names to backend table and column names.

use crate::metamodel::{EntityType, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maps entity types and fields onto backend identifiers.
pub trait NamingResolver: Send + Sync {
    fn table_name(&self, entity: &EntityType) -> String;

    /// `None` when the field has no backing column.
    fn column_name(&self, field: &Field) -> Option<String>;
}

/// Naming rules applied by [`DefaultNaming`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Identifiers that collide with backend keywords; they are wrapped as `_NAME_`
    pub reserved_keywords: Vec<String>,
    /// Convert `camelCase` names to `CAMEL_CASE`
    pub upper_case: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            reserved_keywords: ["COUNT", "WHERE", "FROM", "SELECT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            upper_case: true,
        }
    }
}

impl NamingConfig {
    /// Apply the case and reserved keyword rules to a raw name
    pub fn to_sql_name(&self, name: &str) -> String {
        let name = if self.upper_case {
            to_nice_upper_case(name)
        } else {
            name.to_string()
        };
        if self
            .reserved_keywords
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(&name))
        {
            format!("_{}_", name)
        } else {
            name
        }
    }
}

/// `firstName` becomes `FIRST_NAME`; names already upper-cased are kept.
pub fn to_nice_upper_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if let Some(prev) = previous {
                if prev.is_lowercase() || prev.is_ascii_digit() {
                    result.push('_');
                }
            }
        }
        result.extend(ch.to_uppercase());
        previous = Some(ch);
    }
    result
}

/// Naming resolver honoring explicit table/column names and otherwise
/// applying [`NamingConfig`].
#[derive(Debug, Clone, Default)]
pub struct DefaultNaming {
    config: NamingConfig,
    unmapped: HashSet<Field>,
}

impl DefaultNaming {
    pub fn new(config: NamingConfig) -> Self {
        Self {
            config,
            unmapped: HashSet::new(),
        }
    }

    /// Mark a field as having no column in the backend
    pub fn without_column(mut self, field: &Field) -> Self {
        self.unmapped.insert(field.clone());
        self
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }
}

impl NamingResolver for DefaultNaming {
    fn table_name(&self, entity: &EntityType) -> String {
        match entity.table_name() {
            Some(name) => name.to_string(),
            None => self.config.to_sql_name(entity.name()),
        }
    }

    fn column_name(&self, field: &Field) -> Option<String> {
        if self.unmapped.contains(field) {
            return None;
        }
        Some(match field.db_name() {
            Some(name) => name.to_string(),
            None => self.config.to_sql_name(field.name()),
        })
    }
}
