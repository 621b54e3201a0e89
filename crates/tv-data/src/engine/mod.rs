//! Query engine boundary
//!
//! Tracks never talk to a database directly; they hold an
//! `Arc<dyn QueryEngine>` handed to them by the host.

mod sqlite;

pub use sqlite::SqliteEngine;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::rows::{rows_from_batch, Row};
use crate::schema::RowSchema;

/// Trait for SQL query engines
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run a statement that produces no rows
    async fn execute(&self, sql: &str) -> anyhow::Result<()>;

    /// Run a query and materialize the columns named by `schema`
    async fn query(&self, sql: &str, schema: &RowSchema) -> anyhow::Result<RecordBatch>;

    /// Make a SQL module available. Including a module twice is a no-op.
    async fn include_module(&self, module: &str) -> anyhow::Result<()>;

    /// Get the engine name
    fn engine_name(&self) -> &str;
}

/// Run a query and decode the result into rows
pub async fn query_rows(
    engine: &dyn QueryEngine,
    sql: &str,
    schema: &RowSchema,
) -> anyhow::Result<Vec<Row>> {
    let batch = engine.query(sql, schema).await?;
    Ok(rows_from_batch(&batch, schema)?)
}
