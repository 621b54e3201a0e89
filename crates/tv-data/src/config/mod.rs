//! Engine configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::ModuleRegistry;
use crate::DataError;

/// Configuration for the query engine and the tracks running on it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trace database path. In-memory when absent.
    pub database: Option<PathBuf>,

    /// Extra SQL modules: module name -> script path
    pub modules: BTreeMap<String, PathBuf>,

    /// Maximum number of slices a track loads per refresh
    pub row_limit: Option<usize>,
}

impl EngineConfig {
    /// Load a JSON configuration file. Relative module paths are resolved
    /// against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_json::from_str(&text)?;

        if let Some(base) = path.parent() {
            for script in config.modules.values_mut() {
                if script.is_relative() {
                    *script = base.join(&*script);
                }
            }
        }

        debug!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Built-in modules plus the configured ones
    pub fn module_registry(&self) -> Result<ModuleRegistry, DataError> {
        let mut registry = ModuleRegistry::with_builtins();
        for (name, script) in &self.modules {
            let sql = std::fs::read_to_string(script).map_err(|e| {
                DataError::Config(format!("module '{}' at {:?}: {}", name, script, e))
            })?;
            registry.register(name.clone(), sql);
        }
        Ok(registry)
    }

    /// Display name of the configured database
    pub fn database_name(&self) -> String {
        self.database
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(":memory:")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.database_name(), ":memory:");
    }

    #[test]
    fn test_load_resolves_module_paths() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("extra.sql");
        std::fs::write(&script, "CREATE TABLE extra (id INTEGER);").unwrap();

        let config_path = dir.path().join("engine.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"{{"database": "trace.db", "modules": {{"custom.extra": "extra.sql"}}, "row_limit": 500}}"#
        )
        .unwrap();

        let config = EngineConfig::load(&config_path).unwrap();
        assert_eq!(config.row_limit, Some(500));
        assert_eq!(config.database_name(), "trace.db");
        assert_eq!(config.modules.get("custom.extra"), Some(&script));

        let registry = config.module_registry().unwrap();
        assert_eq!(registry.get("custom.extra"), Some("CREATE TABLE extra (id INTEGER);"));
        assert!(registry.contains(crate::modules::CHROME_INTERACTIONS_MODULE));
    }

    #[test]
    fn test_missing_module_file() {
        let mut config = EngineConfig::default();
        config.modules.insert("custom.gone".to_string(), PathBuf::from("/nonexistent/gone.sql"));
        assert!(matches!(config.module_registry(), Err(DataError::Config(_))));
    }
}
