//! User-invocable commands

use std::fmt;
use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Callback run when a command is invoked
pub type CommandCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A named command
#[derive(Clone)]
pub struct Command {
    pub id: String,
    pub name: String,
    callback: CommandCallback,
}

impl Command {
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        (self.callback)()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of commands keyed by id
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<IndexMap<String, Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any command with the same id
    pub fn register(&self, command: Command) {
        debug!("Registering command {} ({})", command.id, command.name);
        self.commands.write().insert(command.id.clone(), command);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.commands.read().contains_key(id)
    }

    /// `(id, name)` pairs in registration order
    pub fn list(&self) -> Vec<(String, String)> {
        self.commands
            .read()
            .values()
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect()
    }

    /// Run a command by id
    pub fn run(&self, id: &str) -> anyhow::Result<()> {
        // Clone out so the callback may touch the registry
        let command = self
            .commands
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown command '{}'", id))?;

        info!("Running command {}", command.name);
        command.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_registered_command() {
        let registry = CommandRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        registry.register(Command::new("test.Count", "Count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        registry.run("test.Count").unwrap();
        registry.run("test.Count").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(registry.list(), vec![("test.Count".to_string(), "Count".to_string())]);
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        assert!(registry.run("missing").is_err());
    }

    #[test]
    fn test_reregister_replaces() {
        let registry = CommandRegistry::new();
        registry.register(Command::new("a", "First", || Ok(())));
        registry.register(Command::new("a", "Second", || Ok(())));
        assert_eq!(registry.list(), vec![("a".to_string(), "Second".to_string())]);
    }
}
