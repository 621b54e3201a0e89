//! Plugin lifecycle
//!
//! Plugins are activated once at startup, where they register commands,
//! and notified on every trace load, where they register track types.

use std::sync::Arc;
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, info};
use tv_core::{CommandRegistry, StateStore};
use tv_data::QueryEngine;

use crate::registry::TrackRegistry;

/// Host services available at activation
#[derive(Clone)]
pub struct PluginContext {
    pub commands: Arc<CommandRegistry>,
    pub store: Arc<StateStore>,
}

/// Host services available once a trace is open
#[derive(Clone)]
pub struct TraceContext {
    pub engine: Arc<dyn QueryEngine>,
    pub tracks: Arc<TrackRegistry>,
}

/// A timeline plugin
#[async_trait]
pub trait Plugin: Send + Sync {
    fn on_activate(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_trace_load(&self, _ctx: &TraceContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Static description of a plugin
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    pub plugin_id: &'static str,
    pub create: fn() -> Box<dyn Plugin>,
}

/// Owns the loaded plugins and drives their lifecycle
#[derive(Default)]
pub struct PluginManager {
    plugins: IndexMap<&'static str, Box<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate a plugin. Registering the same id twice keeps the first.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> bool {
        if self.plugins.contains_key(descriptor.plugin_id) {
            debug!("Plugin {} already registered", descriptor.plugin_id);
            return false;
        }
        self.plugins.insert(descriptor.plugin_id, (descriptor.create)());
        true
    }

    pub fn plugin_ids(&self) -> Vec<&'static str> {
        self.plugins.keys().copied().collect()
    }

    pub fn activate_all(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        for (id, plugin) in &self.plugins {
            plugin.on_activate(ctx)?;
            info!("Activated plugin {}", id);
        }
        Ok(())
    }

    pub async fn trace_loaded(&self, ctx: &TraceContext) -> anyhow::Result<()> {
        for (id, plugin) in &self.plugins {
            plugin.on_trace_load(ctx).await?;
            debug!("Plugin {} handled trace load", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::{
        CriticalUserInteractionPlugin, ADD_INTERACTION_TRACK_COMMAND,
        CRITICAL_USER_INTERACTIONS_KIND, PLUGIN_ID,
    };
    use tv_data::{ModuleRegistry, SqliteEngine};

    #[test]
    fn test_register_same_plugin_once() {
        let mut manager = PluginManager::new();
        assert!(manager.register(CriticalUserInteractionPlugin::descriptor()));
        assert!(!manager.register(CriticalUserInteractionPlugin::descriptor()));
        assert_eq!(manager.plugin_ids(), vec![PLUGIN_ID]);
    }

    #[tokio::test]
    async fn test_lifecycle_registers_command_and_track() {
        let mut manager = PluginManager::new();
        manager.register(CriticalUserInteractionPlugin::descriptor());

        let plugin_ctx = PluginContext {
            commands: Arc::new(CommandRegistry::new()),
            store: Arc::new(StateStore::new()),
        };
        manager.activate_all(&plugin_ctx).unwrap();
        assert!(plugin_ctx.commands.contains(ADD_INTERACTION_TRACK_COMMAND));

        let engine: Arc<dyn QueryEngine> =
            Arc::new(SqliteEngine::open_in_memory(ModuleRegistry::with_builtins()).unwrap());
        let trace_ctx = TraceContext {
            engine,
            tracks: Arc::new(TrackRegistry::new()),
        };
        manager.trace_loaded(&trace_ctx).await.unwrap();
        assert!(trace_ctx.tracks.contains(CRITICAL_USER_INTERACTIONS_KIND));
    }
}
