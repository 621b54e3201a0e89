//! Timeline - owns the live track instances
//!
//! The state store says which tracks are placed; the timeline keeps one
//! instantiated [`Track`] per placement and keeps them in display order.

use std::sync::Arc;
use indexmap::IndexMap;
use tracing::{error, info, warn};
use tv_core::events::events::{TrackCreated, TrackDestroyed, TrackError as TrackErrorEvent};
use tv_core::{EventBus, TimelineState, TrackKey};
use tv_data::{QueryEngine, TimeWindow};

use crate::details::DetailsPanel;
use crate::registry::TrackRegistry;
use crate::slice::SliceRef;
use crate::track::{Track, TrackContext};

/// Live tracks for the current trace
pub struct Timeline {
    registry: Arc<TrackRegistry>,
    engine: Arc<dyn QueryEngine>,
    event_bus: Arc<EventBus>,
    row_limit: Option<usize>,
    tracks: IndexMap<TrackKey, Box<dyn Track>>,
}

impl Timeline {
    pub fn new(
        registry: Arc<TrackRegistry>,
        engine: Arc<dyn QueryEngine>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            engine,
            event_bus,
            row_limit: None,
            tracks: IndexMap::new(),
        }
    }

    pub fn with_row_limit(mut self, row_limit: Option<usize>) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Bring the live tracks in line with `state`.
    ///
    /// New placements are instantiated and created, removed ones destroyed.
    /// A track that fails to create is reported and skipped. Returns the
    /// number of tracks created.
    pub async fn sync(&mut self, state: &TimelineState) -> usize {
        let mut created = 0;

        for placement in state.ordered_tracks() {
            if self.tracks.contains_key(&placement.key) {
                continue;
            }

            let ctx = TrackContext {
                engine: self.engine.clone(),
                track_key: placement.key,
                row_limit: self.row_limit,
            };
            let mut track = match self.registry.create(&placement.uri, ctx) {
                Ok(track) => track,
                Err(err) => {
                    warn!("Skipping track '{}': {}", placement.name, err);
                    self.report_error(placement.key, err.to_string());
                    continue;
                }
            };

            if let Err(err) = track.on_create().await {
                error!("Failed to create track '{}': {:#}", placement.name, err);
                self.report_error(placement.key, format!("{:#}", err));
                continue;
            }

            info!("Added track '{}' ({})", placement.name, placement.uri);
            self.event_bus.publish(TrackCreated {
                track_key: placement.key,
                uri: placement.uri.clone(),
            });
            self.tracks.insert(placement.key, track);
            created += 1;
        }

        let stale: Vec<TrackKey> = self
            .tracks
            .keys()
            .filter(|key| !state.contains(key))
            .copied()
            .collect();
        for key in stale {
            self.destroy(key).await;
        }

        let order: Vec<TrackKey> = state.ordered_tracks().iter().map(|t| t.key).collect();
        let rank = |key: &TrackKey| order.iter().position(|k| k == key).unwrap_or(usize::MAX);
        self.tracks.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));

        created
    }

    /// Refresh every track. A failing track keeps its previous slices.
    /// Returns the total number of slices loaded.
    pub async fn refresh_all(&mut self, window: Option<TimeWindow>) -> usize {
        let mut total = 0;
        let mut failures = Vec::new();

        for (key, track) in self.tracks.iter_mut() {
            match track.refresh(window).await {
                Ok(count) => total += count,
                Err(err) => {
                    warn!("Refresh of track {} failed: {:#}", key, err);
                    failures.push((*key, format!("{:#}", err)));
                }
            }
        }

        for (key, err) in failures {
            self.report_error(key, err);
        }
        total
    }

    /// Activate `slice` on track `key`
    pub fn click(&self, key: &TrackKey, slice: &SliceRef) -> Option<DetailsPanel> {
        self.tracks.get(key)?.on_slice_click(slice)
    }

    pub fn track(&self, key: &TrackKey) -> Option<&dyn Track> {
        self.tracks.get(key).map(|track| track.as_ref())
    }

    /// Tracks in display order
    pub fn tracks(&self) -> impl Iterator<Item = &dyn Track> {
        self.tracks.values().map(|track| track.as_ref())
    }

    pub fn keys(&self) -> Vec<TrackKey> {
        self.tracks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Destroy every live track
    pub async fn clear(&mut self) {
        for key in self.keys() {
            self.destroy(key).await;
        }
    }

    async fn destroy(&mut self, key: TrackKey) {
        if let Some(mut track) = self.tracks.shift_remove(&key) {
            if let Err(err) = track.on_destroy().await {
                warn!("Failed to tear down track {}: {:#}", key, err);
            }
            self.event_bus.publish(TrackDestroyed { track_key: key });
        }
    }

    fn report_error(&self, track_key: TrackKey, error: String) {
        self.event_bus.publish(TrackErrorEvent { track_key, error });
    }
}
