//! Core host functionality for the trace timeline
//!
//! This crate provides the timeline state store, the actions that mutate
//! it, the event bus used to observe changes and the command registry
//! that user-invocable actions are registered in.

pub mod actions;
pub mod commands;
pub mod events;
pub mod state;

// Re-export commonly used types
pub use actions::{Action, AddTrackArgs, PrimaryTrackSortKey, TrackGroup, TrackKey};
pub use commands::{Command, CommandRegistry};
pub use events::{handler_from_fn, Event, EventBus, EventHandler};
pub use state::{StateError, StateStore, TimelineState, TrackState};
