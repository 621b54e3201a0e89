//! Registration of the interaction track with the host

use async_trait::async_trait;
use tv_core::{
    Action, AddTrackArgs, Command, PrimaryTrackSortKey, StateError, StateStore, TrackGroup,
    TrackKey,
};
use uuid::Uuid;

use crate::plugin::{Plugin, PluginContext, PluginDescriptor, TraceContext};
use crate::registry::TrackDescriptor;
use crate::track::TrackContext;

use super::{create_track, CRITICAL_USER_INTERACTIONS_KIND};

pub const PLUGIN_ID: &str = "perfetto.CriticalUserInteraction";

pub const ADD_INTERACTION_TRACK_COMMAND: &str =
    "perfetto.CriticalUserInteraction.AddInteractionTrack";

pub const ADD_INTERACTION_TRACK_COMMAND_NAME: &str = "Add Chrome Interactions track";

const TRACK_DISPLAY_NAME: &str = "Chrome Interactions";

/// Add an interaction track to the timeline and pin it.
///
/// Both mutations go out as one batch, so no observer sees the track
/// added but not pinned.
pub fn add_critical_user_interaction_track(store: &StateStore) -> Result<TrackKey, StateError> {
    let track_key = Uuid::new_v4();
    store.dispatch_multiple(vec![
        Action::add_track(AddTrackArgs {
            key: track_key,
            uri: CRITICAL_USER_INTERACTIONS_KIND.to_string(),
            name: TRACK_DISPLAY_NAME.to_string(),
            sort_key: PrimaryTrackSortKey::DebugTrack,
            group: TrackGroup::Scrolling,
        }),
        Action::toggle_track_pinned(track_key),
    ])?;
    Ok(track_key)
}

/// Plugin providing the interaction track and its "add track" command
#[derive(Debug, Default)]
pub struct CriticalUserInteractionPlugin;

impl CriticalUserInteractionPlugin {
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            plugin_id: PLUGIN_ID,
            create: || Box::new(CriticalUserInteractionPlugin),
        }
    }
}

#[async_trait]
impl Plugin for CriticalUserInteractionPlugin {
    fn on_activate(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        let store = ctx.store.clone();
        ctx.commands.register(Command::new(
            ADD_INTERACTION_TRACK_COMMAND,
            ADD_INTERACTION_TRACK_COMMAND_NAME,
            move || {
                add_critical_user_interaction_track(&store)?;
                Ok(())
            },
        ));
        Ok(())
    }

    async fn on_trace_load(&self, ctx: &TraceContext) -> anyhow::Result<()> {
        let engine = ctx.engine.clone();
        ctx.tracks.register(TrackDescriptor::new(
            CRITICAL_USER_INTERACTIONS_KIND,
            CRITICAL_USER_INTERACTIONS_KIND,
            TRACK_DISPLAY_NAME,
            move |track_ctx: TrackContext| {
                create_track(TrackContext {
                    engine: engine.clone(),
                    ..track_ctx
                })
            },
        ));
        Ok(())
    }
}
