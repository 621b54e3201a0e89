//! Timeline tracks
//!
//! The generic SQL table slice track, the detail panel resolver, the
//! track and plugin registries, the live timeline and the Chrome critical
//! user interaction track built on top of them.

pub mod details;
pub mod interactions;
pub mod plugin;
pub mod registry;
pub mod slice;
pub mod timeline;
pub mod track;

pub use details::{DetailsPanel, DetailsPanelConfig, PanelBuilder, PanelResolver};
pub use plugin::{Plugin, PluginContext, PluginDescriptor, PluginManager, TraceContext};
pub use registry::{TrackDescriptor, TrackFactory, TrackRegistry};
pub use slice::{Slice, SliceFlags, SliceRef};
pub use timeline::Timeline;
pub use track::{SqlTableSliceSpec, SqlTableSliceTrack, Track, TrackContext, TrackError};

/// Plugins shipped with the timeline
pub fn builtin_plugins() -> Vec<PluginDescriptor> {
    vec![interactions::CriticalUserInteractionPlugin::descriptor()]
}
