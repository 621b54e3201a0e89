//! Track abstraction and the generic SQL table slice track
//!
//! A [`Track`] is what the timeline host holds for each placement. Most
//! tracks are [`SqlTableSliceTrack`]s: the host-facing lifecycle lives
//! here, and a concrete track only supplies a [`SqlTableSliceSpec`]
//! describing its source, schema, slice extension and detail panels.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use tv_core::TrackKey;
use tv_data::{query_rows, QueryEngine, QuerySource, Row, RowSchema, SqlImports, TimeWindow};

use crate::details::DetailsPanel;
use crate::slice::{base_row_to_slice, Slice, SliceRef};

/// Errors raised by the track lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("Track {0} used before on_create")]
    NotCreated(TrackKey),

    #[error("No track type registered for '{0}'")]
    UnknownKind(String),
}

/// Everything a track needs from the host at construction
#[derive(Clone)]
pub struct TrackContext {
    pub engine: Arc<dyn QueryEngine>,
    pub track_key: TrackKey,
    /// Maximum slices loaded per refresh
    pub row_limit: Option<usize>,
}

/// Base trait for all timeline tracks
#[async_trait]
pub trait Track: Send + Sync {
    /// Get the placement key of this track
    fn key(&self) -> TrackKey;

    /// Get the registered kind of this track
    fn kind(&self) -> &str;

    /// The SQL table detail panels read this track's slices from
    fn table_name(&self) -> &str;

    /// Called once after construction
    async fn on_create(&mut self) -> anyhow::Result<()>;

    /// Re-run the track query, replacing the current slices.
    /// Returns the number of slices loaded.
    async fn refresh(&mut self, window: Option<TimeWindow>) -> anyhow::Result<usize>;

    /// Called once before the track is dropped
    async fn on_destroy(&mut self) -> anyhow::Result<()>;

    /// Base view of the current slices
    fn slices(&self) -> Vec<&Slice>;

    /// The current slices with their extension fields
    fn slices_json(&self) -> serde_json::Value;

    /// Resolve the detail panel for a slice in the current snapshot
    fn on_slice_click(&self, slice: &SliceRef) -> Option<DetailsPanel>;

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Declaration of a SQL table backed slice track
pub trait SqlTableSliceSpec: Send + Sync + 'static {
    type Slice: AsRef<Slice> + Serialize + Clone + Debug + Send + Sync;

    /// Registered kind of the track
    fn kind(&self) -> &'static str;

    /// Prefix of the per-track SQL view
    fn view_prefix(&self) -> &'static str {
        "sql_table_slice_track"
    }

    fn data_source(&self) -> QuerySource;

    fn sql_imports(&self) -> SqlImports {
        SqlImports::default()
    }

    /// Columns the track query returns. Must cover the named-slice base.
    fn row_schema(&self) -> RowSchema;

    /// Extend a base slice with the row's extra columns
    fn extend_slice(&self, base: Slice, row: &Row) -> Self::Slice;

    /// Scope the slice id is unique within. `None` when ids are unique
    /// across the whole track.
    fn slice_scope<'a>(&self, _slice: &'a Self::Slice) -> Option<&'a str> {
        None
    }

    /// Panel shown when `slice` is activated
    fn details_panel(&self, slice: &Self::Slice, sql_table_name: &str) -> DetailsPanel;
}

/// A track whose slices come from a SQL table
pub struct SqlTableSliceTrack<S: SqlTableSliceSpec> {
    spec: S,
    engine: Arc<dyn QueryEngine>,
    key: TrackKey,
    table_name: String,
    row_limit: Option<usize>,
    created: bool,
    slices: Vec<S::Slice>,
}

impl<S: SqlTableSliceSpec> SqlTableSliceTrack<S> {
    pub fn new(spec: S, ctx: TrackContext) -> Self {
        let table_name = format!("{}_{}", spec.view_prefix(), ctx.track_key.simple());
        Self {
            spec,
            engine: ctx.engine,
            key: ctx.track_key,
            table_name,
            row_limit: ctx.row_limit,
            created: false,
            slices: Vec::new(),
        }
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    pub fn data_source(&self) -> QuerySource {
        self.spec.data_source()
    }

    pub fn required_modules(&self) -> Vec<String> {
        self.spec.sql_imports().modules().to_vec()
    }

    /// Base mapping first, then the track's extension
    pub fn map_row(&self, row: &Row) -> S::Slice {
        let base = base_row_to_slice(row, self.key);
        self.spec.extend_slice(base, row)
    }

    pub fn on_slice_activated(&self, slice: &S::Slice) -> DetailsPanel {
        self.spec.details_panel(slice, &self.table_name)
    }

    /// Slices from the last refresh
    pub fn typed_slices(&self) -> &[S::Slice] {
        &self.slices
    }

    /// Reference addressing `slice` in this track
    pub fn slice_ref(&self, slice: &S::Slice) -> SliceRef {
        SliceRef {
            id: AsRef::<Slice>::as_ref(slice).id,
            scope: self.spec.slice_scope(slice).map(str::to_string),
        }
    }

    /// Slice addressed by `slice_ref`. An unscoped reference whose id is
    /// shared by several slices resolves to nothing.
    pub fn slice_at(&self, slice_ref: &SliceRef) -> Option<&S::Slice> {
        let mut matches = self.slices.iter().filter(|slice| {
            AsRef::<Slice>::as_ref(*slice).id == slice_ref.id
                && match slice_ref.scope.as_deref() {
                    Some(scope) => self.spec.slice_scope(*slice) == Some(scope),
                    None => true,
                }
        });
        let found = matches.next()?;
        if matches.next().is_some() {
            warn!("Slice id {} is ambiguous on track {}", slice_ref.id, self.key);
            return None;
        }
        Some(found)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Query over the per-track view
    pub fn slice_query(&self, window: Option<TimeWindow>) -> String {
        let schema = self.spec.row_schema();
        let mut sql = format!(
            "SELECT {} FROM {}",
            schema.column_names().join(", "),
            self.table_name
        );
        if let Some(window) = window {
            sql.push_str(" WHERE ");
            sql.push_str(&window.sql_predicate());
        }
        sql.push_str(" ORDER BY ts");
        if let Some(limit) = self.row_limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

#[async_trait]
impl<S: SqlTableSliceSpec> Track for SqlTableSliceTrack<S> {
    fn key(&self) -> TrackKey {
        self.key
    }

    fn kind(&self) -> &str {
        self.spec.kind()
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn on_create(&mut self) -> anyhow::Result<()> {
        for module in self.required_modules() {
            self.engine.include_module(&module).await?;
        }

        let source = self.spec.data_source();
        debug_assert!(
            source.covers(&self.spec.row_schema()),
            "data source misses columns {:?}",
            source.missing_columns(&self.spec.row_schema())
        );

        let sql = format!(
            "CREATE VIEW IF NOT EXISTS {} AS {}",
            self.table_name,
            source.select_sql()
        );
        self.engine.execute(&sql).await?;
        self.created = true;

        info!("Created track {} over {}", self.key, self.table_name);
        Ok(())
    }

    async fn refresh(&mut self, window: Option<TimeWindow>) -> anyhow::Result<usize> {
        if !self.created {
            return Err(TrackError::NotCreated(self.key).into());
        }

        let sql = self.slice_query(window);
        let rows = query_rows(self.engine.as_ref(), &sql, &self.spec.row_schema()).await?;
        self.slices = rows.iter().map(|row| self.map_row(row)).collect();

        debug!("Track {} loaded {} slice(s)", self.key, self.slices.len());
        Ok(self.slices.len())
    }

    async fn on_destroy(&mut self) -> anyhow::Result<()> {
        self.slices.clear();
        if self.created {
            self.engine
                .execute(&format!("DROP VIEW IF EXISTS {}", self.table_name))
                .await?;
            self.created = false;
        }
        Ok(())
    }

    fn slices(&self) -> Vec<&Slice> {
        self.slices.iter().map(AsRef::as_ref).collect()
    }

    fn slices_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.slices).unwrap_or_else(|err| {
            warn!("Failed to serialize slices of track {}: {}", self.key, err);
            serde_json::Value::Null
        })
    }

    fn on_slice_click(&self, slice: &SliceRef) -> Option<DetailsPanel> {
        self.slice_at(slice).map(|slice| self.on_slice_activated(slice))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
