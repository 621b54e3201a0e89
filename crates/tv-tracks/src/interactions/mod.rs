//! Chrome critical user interaction track
//!
//! Shows rows of the `chrome_interactions` table as slices. Activating a
//! slice opens a panel chosen by the slice's `type`: page loads get their
//! own panel, everything else the generic interaction panel.

mod plugin;

pub use plugin::{
    add_critical_user_interaction_track, CriticalUserInteractionPlugin,
    ADD_INTERACTION_TRACK_COMMAND, ADD_INTERACTION_TRACK_COMMAND_NAME, PLUGIN_ID,
};

use serde::Serialize;
use tv_data::modules::CHROME_INTERACTIONS_MODULE;
use tv_data::schema::ColumnType;
use tv_data::{QuerySource, Row, RowSchema, SqlImports};

use crate::details::{DetailsPanel, PanelBuilder, PanelResolver, GENERIC_SLICE_DETAILS_KIND};
use crate::slice::{Slice, SliceRef};
use crate::track::{SqlTableSliceSpec, SqlTableSliceTrack, Track, TrackContext};

/// Registered kind of the interaction track
pub const CRITICAL_USER_INTERACTIONS_KIND: &str = "org.chromium.CriticalUserInteraction.track";

pub const CRITICAL_USER_INTERACTIONS_TABLE: &str = "chrome_interactions";

pub const TYPE_COLUMN: &str = "type";

pub const PAGE_LOAD_TYPE: &str = "chrome_page_loads";

pub const PAGE_LOAD_DETAILS_KIND: &str = "page-load-panel";

const PAGE_LOAD_PANEL: PanelBuilder = PanelBuilder::new(PAGE_LOAD_DETAILS_KIND, "Chrome Page Load");
const INTERACTION_PANEL: PanelBuilder =
    PanelBuilder::new(GENERIC_SLICE_DETAILS_KIND, "Chrome Interaction");

/// Known interaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InteractionKind {
    PageLoad,
    Unknown,
}

/// Classify a raw `type` value. Exact match only; anything unrecognized is
/// `Unknown`.
pub fn classify(raw: &str) -> InteractionKind {
    match raw {
        PAGE_LOAD_TYPE => InteractionKind::PageLoad,
        _ => InteractionKind::Unknown,
    }
}

/// [`classify`] for values that may be absent
pub fn classify_opt(raw: Option<&str>) -> InteractionKind {
    raw.map(classify).unwrap_or(InteractionKind::Unknown)
}

/// Row schema of the interaction track
pub fn critical_user_interactions_row() -> RowSchema {
    RowSchema::named_slice().with_column(TYPE_COLUMN, ColumnType::Str)
}

/// An interaction slice: the base slice plus its raw `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalUserInteractionSlice {
    #[serde(flatten)]
    pub base: Slice,
    #[serde(rename = "type")]
    pub interaction_type: String,
}

impl CriticalUserInteractionSlice {
    pub fn kind(&self) -> InteractionKind {
        classify(&self.interaction_type)
    }
}

impl AsRef<Slice> for CriticalUserInteractionSlice {
    fn as_ref(&self) -> &Slice {
        &self.base
    }
}

/// Track declaration for critical user interactions
#[derive(Debug, Clone)]
pub struct CriticalUserInteractions {
    panels: PanelResolver<InteractionKind>,
}

impl CriticalUserInteractions {
    pub fn new() -> Self {
        Self {
            panels: PanelResolver::new(INTERACTION_PANEL)
                .with_panel(InteractionKind::PageLoad, PAGE_LOAD_PANEL),
        }
    }

    pub fn panels(&self) -> &PanelResolver<InteractionKind> {
        &self.panels
    }
}

impl Default for CriticalUserInteractions {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlTableSliceSpec for CriticalUserInteractions {
    type Slice = CriticalUserInteractionSlice;

    fn kind(&self) -> &'static str {
        CRITICAL_USER_INTERACTIONS_KIND
    }

    fn view_prefix(&self) -> &'static str {
        "critical_user_interactions"
    }

    fn data_source(&self) -> QuerySource {
        QuerySource::new(
            CRITICAL_USER_INTERACTIONS_TABLE,
            ["scoped_id AS id", "name", "ts", "dur", "type"],
        )
    }

    fn sql_imports(&self) -> SqlImports {
        SqlImports::new([CHROME_INTERACTIONS_MODULE])
    }

    fn row_schema(&self) -> RowSchema {
        critical_user_interactions_row()
    }

    fn extend_slice(&self, base: Slice, row: &Row) -> CriticalUserInteractionSlice {
        CriticalUserInteractionSlice {
            base,
            interaction_type: row.get_str(TYPE_COLUMN).unwrap_or_default().to_string(),
        }
    }

    // scoped ids restart per interaction source
    fn slice_scope<'a>(&self, slice: &'a CriticalUserInteractionSlice) -> Option<&'a str> {
        Some(&slice.interaction_type)
    }

    fn details_panel(&self, slice: &CriticalUserInteractionSlice, sql_table_name: &str) -> DetailsPanel {
        self.panels.resolve(slice.kind(), sql_table_name)
    }
}

pub type CriticalUserInteractionTrack = SqlTableSliceTrack<CriticalUserInteractions>;

/// Track factory registered with the host
pub fn create_track(ctx: TrackContext) -> Box<dyn Track> {
    Box::new(CriticalUserInteractionTrack::new(CriticalUserInteractions::new(), ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::base_row_to_slice;
    use std::sync::Arc;
    use tv_data::{ModuleRegistry, QueryEngine, SqliteEngine};
    use uuid::Uuid;

    fn interaction_row(id: i64, name: &str, ts: i64, dur: i64, ty: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("ts", ts)
            .with("dur", dur)
            .with("type", ty)
    }

    fn track_with_engine() -> (CriticalUserInteractionTrack, Arc<dyn QueryEngine>) {
        let engine: Arc<dyn QueryEngine> =
            Arc::new(SqliteEngine::open_in_memory(ModuleRegistry::with_builtins()).unwrap());
        let track = CriticalUserInteractionTrack::new(
            CriticalUserInteractions::new(),
            TrackContext {
                engine: engine.clone(),
                track_key: Uuid::new_v4(),
                row_limit: None,
            },
        );
        (track, engine)
    }

    fn track() -> CriticalUserInteractionTrack {
        track_with_engine().0
    }

    #[test]
    fn test_classify_exact_match() {
        assert_eq!(classify("chrome_page_loads"), InteractionKind::PageLoad);
        assert_eq!(classify(""), InteractionKind::Unknown);
        assert_eq!(classify("anything_else"), InteractionKind::Unknown);
        assert_eq!(classify("Chrome_Page_Loads"), InteractionKind::Unknown);
        assert_eq!(classify(" chrome_page_loads"), InteractionKind::Unknown);
        assert_eq!(classify_opt(None), InteractionKind::Unknown);
        assert_eq!(classify_opt(Some("chrome_page_loads")), InteractionKind::PageLoad);
    }

    #[test]
    fn test_data_source_covers_schema() {
        let spec = CriticalUserInteractions::new();
        let source = spec.data_source();
        assert_eq!(source.table(), "chrome_interactions");
        assert_eq!(source.columns()[0].expression(), "scoped_id");
        assert!(source.covers(&spec.row_schema()));
        assert_eq!(spec.sql_imports().modules(), &["chrome.interactions".to_string()]);
    }

    #[test]
    fn test_map_row_extends_base() {
        let track = track();
        for ty in ["chrome_page_loads", "some_future_type", ""] {
            let row = interaction_row(1, "load", 100, 50, ty);
            let slice = track.map_row(&row);
            assert_eq!(slice.interaction_type, ty);
            assert_eq!(slice.base, base_row_to_slice(&row, track.key()));
        }
    }

    #[test]
    fn test_page_load_resolves_to_page_load_panel() {
        let track = track();
        let slice = track.map_row(&interaction_row(1, "load", 100, 50, "chrome_page_loads"));
        let panel = track.on_slice_activated(&slice);

        assert_eq!(panel.kind, "page-load-panel");
        assert_eq!(panel.config.title, "Chrome Page Load");
        assert_eq!(panel.config.sql_table_name, track.table_name());
    }

    #[test]
    fn test_unknown_type_resolves_to_generic_panel() {
        let track = track();
        let slice = track.map_row(&interaction_row(2, "x", 0, 0, "some_future_type"));
        let panel = track.on_slice_activated(&slice);

        assert_eq!(panel.kind, "generic-panel");
        assert_eq!(panel.config.title, "Chrome Interaction");
        assert_eq!(panel.config.sql_table_name, track.table_name());
    }

    #[test]
    fn test_resolve_is_pure() {
        let track = track();
        let slice = track.map_row(&interaction_row(1, "load", 100, 50, "chrome_page_loads"));
        assert_eq!(track.on_slice_activated(&slice), track.on_slice_activated(&slice));
    }

    #[test]
    fn test_missing_type_is_empty_and_unknown() {
        let track = track();
        let row = Row::new().with("id", 3i64).with("name", "n").with("ts", 0i64).with("dur", 1i64);
        let slice = track.map_row(&row);
        assert_eq!(slice.interaction_type, "");
        assert_eq!(slice.kind(), InteractionKind::Unknown);
    }

    #[test]
    fn test_slice_serializes_type_field() {
        let track = track();
        let slice = track.map_row(&interaction_row(1, "load", 100, 50, "chrome_page_loads"));
        let json = serde_json::to_value(&slice).unwrap();
        assert_eq!(json["type"], "chrome_page_loads");
        assert_eq!(json["title"], "load");
        assert_eq!(json["end"], 150);
    }

    #[tokio::test]
    async fn test_end_to_end_over_sqlite() {
        let (mut track, engine) = track_with_engine();
        track.on_create().await.unwrap();
        assert!(track.table_name().starts_with("critical_user_interactions_"));
        assert_eq!(track.refresh(None).await.unwrap(), 0);

        engine
            .execute(
                "INSERT INTO chrome_page_loads (id, url, navigation_start_ts, dur) VALUES (1, 'https://example.test', 100, 50);
                 INSERT INTO chrome_web_content_interactions (id, interaction_type, ts, dur) VALUES (2, 'click', 300, 20);",
            )
            .await
            .unwrap();
        assert_eq!(track.refresh(None).await.unwrap(), 2);

        let page_load = track.on_slice_click(&SliceRef::id(1)).unwrap();
        assert_eq!(page_load.kind, PAGE_LOAD_DETAILS_KIND);
        assert_eq!(page_load.config.sql_table_name, track.table_name());

        let other = track.on_slice_click(&SliceRef::id(2)).unwrap();
        assert_eq!(other.kind, GENERIC_SLICE_DETAILS_KIND);
        assert_eq!(other.config.title, "Chrome Interaction");
    }

    #[tokio::test]
    async fn test_colliding_scoped_ids_resolve_by_type() {
        let (mut track, engine) = track_with_engine();
        track.on_create().await.unwrap();
        engine
            .execute(
                "INSERT INTO chrome_web_content_interactions (id, interaction_type, ts, dur) VALUES (1, 'click', 50, 5);
                 INSERT INTO chrome_page_loads (id, url, navigation_start_ts, dur) VALUES (1, 'https://example.test', 100, 50);",
            )
            .await
            .unwrap();
        track.refresh(None).await.unwrap();

        let page_load = track
            .typed_slices()
            .iter()
            .find(|s| s.kind() == InteractionKind::PageLoad)
            .unwrap();
        let page_load_ref = track.slice_ref(page_load);
        assert_eq!(page_load_ref, SliceRef::scoped(PAGE_LOAD_TYPE, 1));
        assert_eq!(
            track.on_slice_click(&page_load_ref),
            Some(track.on_slice_activated(page_load))
        );
        assert_eq!(track.on_slice_click(&page_load_ref).unwrap().kind, PAGE_LOAD_DETAILS_KIND);

        let click = track
            .on_slice_click(&SliceRef::scoped("chrome_web_content_interactions", 1))
            .unwrap();
        assert_eq!(click.kind, GENERIC_SLICE_DETAILS_KIND);

        assert!(track.on_slice_click(&SliceRef::id(1)).is_none());
    }
}
