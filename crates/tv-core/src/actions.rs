//! Actions that mutate the timeline state

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track placement on the timeline
pub type TrackKey = Uuid;

/// Group name used for tracks in the scrolling area
pub const SCROLLING_TRACK_GROUP: &str = "ScrollingTracks";

/// Primary ordering of tracks; earlier variants sort first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimaryTrackSortKey {
    DebugTrack,
    NullTrack,
    ProcessSchedulingTrack,
    ProcessSummaryTrack,
    ExpectedFramesSliceTrack,
    ActualFramesSliceTrack,
    MainThread,
    RenderThread,
    OrdinaryThread,
    CounterTrack,
    AsyncSliceTrack,
    OrdinaryTrack,
}

/// Where on the timeline a track lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackGroup {
    /// The top-level scrolling area
    Scrolling,
    /// A named, collapsible group
    Named(String),
}

impl TrackGroup {
    pub fn name(&self) -> &str {
        match self {
            TrackGroup::Scrolling => SCROLLING_TRACK_GROUP,
            TrackGroup::Named(name) => name,
        }
    }
}

/// Arguments for adding a track placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTrackArgs {
    pub key: TrackKey,
    /// Registered track kind used to instantiate the track
    pub uri: String,
    pub name: String,
    pub sort_key: PrimaryTrackSortKey,
    pub group: TrackGroup,
}

/// A single state mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    AddTrack(AddTrackArgs),
    ToggleTrackPinned { track_key: TrackKey },
    RemoveTrack { track_key: TrackKey },
}

impl Action {
    pub fn add_track(args: AddTrackArgs) -> Self {
        Action::AddTrack(args)
    }

    pub fn toggle_track_pinned(track_key: TrackKey) -> Self {
        Action::ToggleTrackPinned { track_key }
    }

    pub fn remove_track(track_key: TrackKey) -> Self {
        Action::RemoveTrack { track_key }
    }

    /// The track this action targets
    pub fn track_key(&self) -> TrackKey {
        match self {
            Action::AddTrack(args) => args.key,
            Action::ToggleTrackPinned { track_key } | Action::RemoveTrack { track_key } => *track_key,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::AddTrack(_) => "add_track",
            Action::ToggleTrackPinned { .. } => "toggle_track_pinned",
            Action::RemoveTrack { .. } => "remove_track",
        }
    }
}
