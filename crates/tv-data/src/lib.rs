//! Data access for SQL-backed timeline tracks
//!
//! Row schemas, decoded rows, query source declarations and the query
//! engine boundary that tracks run their SQL through.

pub mod config;
pub mod engine;
pub mod modules;
pub mod query;
pub mod rows;
pub mod schema;

use arrow::error::ArrowError;
use tokio::task::JoinError;
use thiserror::Error;

// Re-exports
pub use config::EngineConfig;
pub use engine::{query_rows, QueryEngine, SqliteEngine};
pub use modules::ModuleRegistry;
pub use query::{ColumnExpr, QuerySource, SqlImports, TimeWindow};
pub use rows::{rows_from_batch, Row, Value};
pub use schema::{ColumnType, RowSchema};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Column '{0}' missing from query result")]
    MissingColumn(String),

    #[error("Unknown SQL module '{0}'")]
    ModuleNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}
