//! Error types for query compilation, binding and execution.

use thiserror::Error;

/// Errors reported by a backend driver.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Parameter {index} out of range (statement has {count} parameters)")]
    ParameterIndex { index: usize, count: usize },

    #[error("Parameter {0} was never set")]
    MissingParameter(usize),

    #[error("Column index {index} out of range (row has {width} columns)")]
    ColumnIndex { index: usize, width: usize },

    #[error("No current row")]
    NoRow,

    #[error("Cannot read {actual} as {expected}")]
    Conversion {
        expected: &'static str,
        actual: String,
    },

    #[error("Statement is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DriverError {
    fn from(err: anyhow::Error) -> Self {
        DriverError::Other(format!("{:#}", err))
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors surfaced by the query layer.
#[derive(Error, Debug)]
pub enum SqlStreamError {
    /// A selected or ordered field has no column mapping.
    #[error("Column for field {field} could not be resolved")]
    UnresolvedColumn { field: String },

    #[error("Failed to prepare request {sql}: {source}")]
    Prepare {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to execute request {sql}: {source}")]
    Execution {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Null not supported for field {field}, should be explicit (is null / is not null)")]
    NullLiteral { field: String },

    #[error("Bound {bound} parameters but the request declares {compiled}")]
    BindCountMismatch { compiled: usize, bound: usize },

    #[error("Cursor is closed")]
    CursorClosed,

    #[error("Query closed: {sql}")]
    QueryClosed { sql: String },

    #[error("No field selected")]
    EmptySelection,

    #[error("Accessor for {field} has no current row")]
    NoCurrentRow { field: String },

    #[error("Accessor for {field} is not bound to a result column")]
    UnboundAccessor { field: String },

    #[error("Accessor for {field} is bound to column {assigned}, cannot rebind to {requested}")]
    AccessorRebound {
        field: String,
        assigned: usize,
        requested: usize,
    },

    #[error("Field {field} is declared {expected} but got {actual}")]
    KindMismatch {
        field: String,
        expected: &'static str,
        actual: String,
    },

    #[error("No result returned for: {sql}")]
    NotFound { sql: String },

    #[error("Too many results for: {sql}")]
    TooManyRows { sql: String },

    #[error("Cannot convert value for {column}: {message}")]
    TypeCoercion { column: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlStreamError {
    /// True for the cardinality errors of unique-result execution.
    pub fn is_cardinality(&self) -> bool {
        matches!(
            self,
            SqlStreamError::NotFound { .. } | SqlStreamError::TooManyRows { .. }
        )
    }
}

/// Result type for the query layer.
pub type Result<T> = std::result::Result<T, SqlStreamError>;
