//! Entry point binding a connection, a naming resolver and the configuration.

use crate::builder::{CreateBuilder, MutationRequest, SelectBuilder, UpdateBuilder};
use crate::compiler::compile_delete;
use crate::config::SqlStreamsConfig;
use crate::constraint::Constraint;
use crate::driver::{Connection, SharedStatement};
use crate::error::{Result, SqlStreamError};
use crate::metamodel::EntityType;
use crate::naming::{DefaultNaming, NamingResolver};
use std::sync::Arc;

/// Factory for select and mutation builders over one connection.
#[derive(Clone)]
pub struct SqlSession {
    connection: Arc<dyn Connection>,
    naming: Arc<dyn NamingResolver>,
    config: SqlStreamsConfig,
}

impl SqlSession {
    /// Session using [`DefaultNaming`] with the configured naming rules
    pub fn new(connection: Arc<dyn Connection>, config: SqlStreamsConfig) -> Self {
        let naming = Arc::new(DefaultNaming::new(config.naming.clone()));
        Self {
            connection,
            naming,
            config,
        }
    }

    pub fn with_naming(
        connection: Arc<dyn Connection>,
        naming: Arc<dyn NamingResolver>,
        config: SqlStreamsConfig,
    ) -> Self {
        Self {
            connection,
            naming,
            config,
        }
    }

    pub fn config(&self) -> &SqlStreamsConfig {
        &self.config
    }

    pub fn naming(&self) -> &dyn NamingResolver {
        self.naming.as_ref()
    }

    /// Select rows of `entity`
    pub fn select(&self, entity: &EntityType) -> SelectBuilder {
        SelectBuilder::for_entity(self.clone(), entity.clone(), None)
    }

    /// Select rows of `entity` matching `constraint`
    pub fn select_where(&self, entity: &EntityType, constraint: Constraint) -> SelectBuilder {
        SelectBuilder::for_entity(self.clone(), entity.clone(), Some(constraint))
    }

    /// Select over caller-written SQL; accessors are matched to result
    /// columns by name.
    pub fn select_sql(&self, sql: impl Into<String>) -> SelectBuilder {
        SelectBuilder::for_sql(self.clone(), sql.into(), None)
    }

    /// Select over caller-written SQL whose `?` placeholders take the values
    /// of `constraint`, in the order the constraint binds them.
    pub fn select_sql_where(
        &self,
        sql: impl Into<String>,
        constraint: Constraint,
    ) -> SelectBuilder {
        SelectBuilder::for_sql(self.clone(), sql.into(), Some(constraint))
    }

    pub fn create(&self, entity: &EntityType) -> CreateBuilder {
        CreateBuilder::new(self.clone(), entity.clone())
    }

    pub fn update(&self, entity: &EntityType, constraint: Option<Constraint>) -> UpdateBuilder {
        UpdateBuilder::new(self.clone(), entity.clone(), constraint)
    }

    pub fn delete(
        &self,
        entity: &EntityType,
        constraint: Option<Constraint>,
    ) -> Result<MutationRequest> {
        let compiled = compile_delete(entity, constraint.as_ref(), self.naming())?;
        MutationRequest::prepare(self, compiled)
    }

    pub(crate) fn prepare(&self, sql: &str) -> Result<SharedStatement> {
        log::debug!("Preparing: {}", sql);
        self.connection
            .prepare(sql)
            .map(SharedStatement::new)
            .map_err(|source| SqlStreamError::Prepare {
                sql: sql.to_string(),
                source,
            })
    }
}
