//! In-memory relational backend.
//!
//! Parses the SQL dialect the query compiler emits and evaluates it over
//! tables held in memory:
//!
//! - **Parsing**: [`lexer`] and [`parser`] turn SQL text into the [`ast`]
//! - **Storage**: [`MemoryDatabase`] owns the tables behind a concurrent map
//! - **Execution**: [`MemoryStatement`] evaluates selections, joins and mutations

pub mod ast;
pub mod database;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod statement;
pub mod table;

pub use database::MemoryDatabase;
pub use statement::{MemoryConnection, MemoryRowSet, MemoryStatement};
pub use table::{ColumnDef, ColumnType, MemoryTable};
