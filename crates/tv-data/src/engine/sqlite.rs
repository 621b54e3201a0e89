//! SQLite query engine implementation

use std::path::Path;
use std::sync::Arc;
use ahash::AHashSet;
use arrow::array::{ArrayRef, Int64Builder, StringBuilder};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{types::ValueRef, Connection};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::modules::ModuleRegistry;
use crate::schema::{ColumnType, RowSchema};
use crate::DataError;

use super::QueryEngine;

/// SQLite-backed query engine over a single connection
pub struct SqliteEngine {
    name: String,
    conn: Arc<Mutex<Connection>>,
    modules: Arc<ModuleRegistry>,
    included: Arc<Mutex<AHashSet<String>>>,
    // held from the included check until the module has run
    include_guard: Arc<tokio::sync::Mutex<()>>,
}

impl SqliteEngine {
    /// Open a trace database file
    pub fn open<P: AsRef<Path>>(path: P, modules: ModuleRegistry) -> Result<Self, DataError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.db")
            .to_string();

        info!("Opened trace database {:?}", path);
        Ok(Self::with_connection(name, conn, modules))
    }

    /// Open an empty in-memory database
    pub fn open_in_memory(modules: ModuleRegistry) -> Result<Self, DataError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(":memory:".to_string(), conn, modules))
    }

    /// Open the database named by `config` with its module set
    pub fn from_config(config: &EngineConfig) -> Result<Self, DataError> {
        let modules = config.module_registry()?;
        match &config.database {
            Some(path) => Self::open(path, modules),
            None => Self::open_in_memory(modules),
        }
    }

    fn with_connection(name: String, conn: Connection, modules: ModuleRegistry) -> Self {
        Self {
            name,
            conn: Arc::new(Mutex::new(conn)),
            modules: Arc::new(modules),
            included: Arc::new(Mutex::new(AHashSet::new())),
            include_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Modules included so far, sorted
    pub fn included_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.included.lock().iter().cloned().collect();
        modules.sort();
        modules
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DataError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await?
    }

    /// Execute a query and build one array per schema column
    fn build_batch(conn: &Connection, sql: &str, schema: &RowSchema) -> Result<RecordBatch, DataError> {
        let mut stmt = conn.prepare(sql)?;

        // Map schema columns onto result positions
        let result_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut positions = Vec::with_capacity(schema.len());
        for (name, _) in schema.columns() {
            let idx = result_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
            positions.push(idx);
        }

        let mut builders: Vec<ColumnBuilder> = schema
            .columns()
            .map(|(_, ty)| ColumnBuilder::new(ty))
            .collect();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (builder, idx) in builders.iter_mut().zip(&positions) {
                builder.append(row.get_ref(*idx)?);
            }
        }

        let arrays: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();
        let arrow_schema: Arc<Schema> = Arc::new(schema.to_arrow());
        Ok(RecordBatch::try_new(arrow_schema, arrays)?)
    }
}

/// Typed array builder for one result column
enum ColumnBuilder {
    Long(Int64Builder),
    Str(StringBuilder),
}

impl ColumnBuilder {
    fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Str => ColumnBuilder::Str(StringBuilder::new()),
            ColumnType::Long | ColumnType::Duration | ColumnType::Timestamp => {
                ColumnBuilder::Long(Int64Builder::new())
            }
        }
    }

    fn append(&mut self, value: ValueRef<'_>) {
        match self {
            ColumnBuilder::Long(builder) => match value {
                ValueRef::Integer(i) => builder.append_value(i),
                ValueRef::Real(f) => builder.append_value(f as i64),
                _ => builder.append_null(),
            },
            ColumnBuilder::Str(builder) => match value {
                ValueRef::Text(s) => builder.append_value(String::from_utf8_lossy(s)),
                ValueRef::Integer(i) => builder.append_value(i.to_string()),
                ValueRef::Real(f) => builder.append_value(f.to_string()),
                _ => builder.append_null(),
            },
        }
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Long(mut builder) => Arc::new(builder.finish()),
            ColumnBuilder::Str(mut builder) => Arc::new(builder.finish()),
        }
    }
}

#[async_trait]
impl QueryEngine for SqliteEngine {
    async fn execute(&self, sql: &str) -> anyhow::Result<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn query(&self, sql: &str, schema: &RowSchema) -> anyhow::Result<RecordBatch> {
        let sql = sql.to_string();
        let schema = schema.clone();
        debug!("Running query: {}", sql);
        let batch = self
            .with_conn(move |conn| Self::build_batch(conn, &sql, &schema))
            .await?;
        Ok(batch)
    }

    async fn include_module(&self, module: &str) -> anyhow::Result<()> {
        let _guard = self.include_guard.lock().await;
        if self.included.lock().contains(module) {
            return Ok(());
        }

        let script = self
            .modules
            .get(module)
            .ok_or_else(|| DataError::ModuleNotFound(module.to_string()))?
            .to_string();

        self.execute(&script).await?;
        self.included.lock().insert(module.to_string());
        info!("Included SQL module {}", module);
        Ok(())
    }

    fn engine_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::CHROME_INTERACTIONS_MODULE;
    use crate::rows::rows_from_batch;

    fn interaction_schema() -> RowSchema {
        RowSchema::named_slice().with_column("type", ColumnType::Str)
    }

    #[tokio::test]
    async fn test_include_module_once() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::with_builtins()).unwrap();
        engine.include_module(CHROME_INTERACTIONS_MODULE).await.unwrap();
        engine.include_module(CHROME_INTERACTIONS_MODULE).await.unwrap();
        assert_eq!(engine.included_modules(), vec![CHROME_INTERACTIONS_MODULE.to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_includes_run_module_once() {
        let mut modules = ModuleRegistry::new();
        modules.register("test.counter", "CREATE TABLE counter (x INTEGER);");
        let engine = SqliteEngine::open_in_memory(modules).unwrap();

        let (a, b) = tokio::join!(
            engine.include_module("test.counter"),
            engine.include_module("test.counter")
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(engine.included_modules(), vec!["test.counter".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::new()).unwrap();
        let err = engine.include_module("does.not.exist").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::ModuleNotFound(m)) if m == "does.not.exist"
        ));
    }

    #[tokio::test]
    async fn test_query_interactions_view() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::with_builtins()).unwrap();
        engine.include_module(CHROME_INTERACTIONS_MODULE).await.unwrap();
        engine
            .execute(
                "INSERT INTO chrome_page_loads (id, url, navigation_start_ts, dur) VALUES (1, 'https://a.test', 100, 50);
                 INSERT INTO chrome_page_loads (id, url, navigation_start_ts, dur) VALUES (2, NULL, 400, NULL);
                 INSERT INTO chrome_web_content_interactions (id, interaction_type, ts, dur) VALUES (1, 'click', 250, 10);",
            )
            .await
            .unwrap();

        let batch = engine
            .query(
                "SELECT scoped_id AS id, name, ts, dur, type FROM chrome_interactions ORDER BY ts",
                &interaction_schema(),
            )
            .await
            .unwrap();
        let rows = rows_from_batch(&batch, &interaction_schema()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get_str("name"), Some("https://a.test"));
        assert_eq!(rows[1].get_str("type"), Some("chrome_web_content_interactions"));
        assert_eq!(rows[2].get_str("name"), Some("Page Load"));
        assert_eq!(rows[2].get_i64("dur"), Some(-1));
    }

    #[tokio::test]
    async fn test_missing_result_column() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::new()).unwrap();
        let err = engine
            .query("SELECT 1 AS id, 'n' AS name, 0 AS ts, 0 AS dur", &interaction_schema())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MissingColumn(c)) if c == "type"
        ));
    }

    #[tokio::test]
    async fn test_query_errors_surface() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::new()).unwrap();
        let result = engine.query("SELECT * FROM no_such_table", &interaction_schema()).await;
        assert!(result.is_err());
    }
}
