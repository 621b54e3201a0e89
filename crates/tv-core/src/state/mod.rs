use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::actions::{Action, AddTrackArgs, PrimaryTrackSortKey, TrackGroup, TrackKey};
use crate::events::{events::StateChanged, EventBus};

/// Errors raised while applying actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Track {0} already exists")]
    DuplicateTrack(TrackKey),

    #[error("Track {0} does not exist")]
    UnknownTrack(TrackKey),
}

/// A track placement on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackState {
    pub key: TrackKey,
    pub uri: String,
    pub name: String,
    pub sort_key: PrimaryTrackSortKey,
    pub group: TrackGroup,
}

impl From<AddTrackArgs> for TrackState {
    fn from(args: AddTrackArgs) -> Self {
        Self {
            key: args.key,
            uri: args.uri,
            name: args.name,
            sort_key: args.sort_key,
            group: args.group,
        }
    }
}

/// The timeline state
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimelineState {
    /// Tracks in insertion order
    tracks: IndexMap<TrackKey, TrackState>,

    /// Pinned tracks in pin order
    pinned: Vec<TrackKey>,

    /// Bumped once per applied batch
    generation: u64,
}

impl TimelineState {
    pub fn tracks(&self) -> impl Iterator<Item = &TrackState> {
        self.tracks.values()
    }

    pub fn track(&self, key: &TrackKey) -> Option<&TrackState> {
        self.tracks.get(key)
    }

    pub fn contains(&self, key: &TrackKey) -> bool {
        self.tracks.contains_key(key)
    }

    pub fn pinned(&self) -> &[TrackKey] {
        &self.pinned
    }

    pub fn is_pinned(&self, key: &TrackKey) -> bool {
        self.pinned.contains(key)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Display order: pinned tracks in pin order, then the rest by sort key
    /// with insertion order breaking ties.
    pub fn ordered_tracks(&self) -> Vec<&TrackState> {
        let mut ordered: Vec<&TrackState> = self
            .pinned
            .iter()
            .filter_map(|key| self.tracks.get(key))
            .collect();

        let mut rest: Vec<(usize, &TrackState)> = self
            .tracks
            .values()
            .enumerate()
            .filter(|(_, track)| !self.is_pinned(&track.key))
            .collect();
        rest.sort_by_key(|(idx, track)| (track.sort_key, *idx));

        ordered.extend(rest.into_iter().map(|(_, track)| track));
        ordered
    }

    /// Apply a single action in place
    fn apply(&mut self, action: &Action) -> Result<(), StateError> {
        match action {
            Action::AddTrack(args) => {
                if self.tracks.contains_key(&args.key) {
                    return Err(StateError::DuplicateTrack(args.key));
                }
                self.tracks.insert(args.key, TrackState::from(args.clone()));
            }
            Action::ToggleTrackPinned { track_key } => {
                if !self.tracks.contains_key(track_key) {
                    return Err(StateError::UnknownTrack(*track_key));
                }
                if let Some(pos) = self.pinned.iter().position(|k| k == track_key) {
                    self.pinned.remove(pos);
                } else {
                    self.pinned.push(*track_key);
                }
            }
            Action::RemoveTrack { track_key } => {
                if self.tracks.shift_remove(track_key).is_none() {
                    return Err(StateError::UnknownTrack(*track_key));
                }
                self.pinned.retain(|k| k != track_key);
            }
        }
        Ok(())
    }
}

/// Shared timeline state with atomic batch dispatch
pub struct StateStore {
    state: Arc<RwLock<TimelineState>>,
    event_bus: Arc<EventBus>,
}

impl StateStore {
    /// Create an empty store with its own event bus
    pub fn new() -> Self {
        Self::with_event_bus(Arc::new(EventBus::new()))
    }

    /// Create an empty store publishing on `event_bus`
    pub fn with_event_bus(event_bus: Arc<EventBus>) -> Self {
        Self {
            state: Arc::new(RwLock::new(TimelineState::default())),
            event_bus,
        }
    }

    /// A copy of the current state
    pub fn snapshot(&self) -> TimelineState {
        self.state.read().clone()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Dispatch a single action
    pub fn dispatch(&self, action: Action) -> Result<u64, StateError> {
        self.dispatch_multiple(vec![action])
    }

    /// Dispatch a batch of actions atomically.
    ///
    /// The batch is applied to a copy of the state and swapped in under a
    /// single write lock: readers see all of it or none of it. If any action
    /// fails the state is left untouched. One `StateChanged` event is
    /// published per successful batch. Returns the new generation.
    pub fn dispatch_multiple(&self, actions: Vec<Action>) -> Result<u64, StateError> {
        if actions.is_empty() {
            return Ok(self.state.read().generation);
        }

        let generation = {
            let mut state = self.state.write();
            let mut next = state.clone();
            for action in &actions {
                next.apply(action)?;
            }
            next.generation += 1;
            let generation = next.generation;
            *state = next;
            generation
        };

        debug!(
            "Applied {} action(s) at generation {}: {:?}",
            actions.len(),
            generation,
            actions.iter().map(Action::name).collect::<Vec<_>>()
        );

        self.event_bus.publish(StateChanged { generation, actions });
        Ok(generation)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
