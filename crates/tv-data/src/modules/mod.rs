//! Named SQL modules that tracks include before querying
//!
//! A module is a SQL script that defines tables or views. Engines run each
//! module at most once.

use ahash::AHashMap;
use once_cell::sync::Lazy;

pub const CHROME_INTERACTIONS_MODULE: &str = "chrome.interactions";

// Interaction sources are created empty when the trace does not carry them,
// so the view always resolves. Page loads without a finished metric stay
// open (dur = -1).
const CHROME_INTERACTIONS_SQL: &str = "
CREATE TABLE IF NOT EXISTS chrome_page_loads (
    id INTEGER PRIMARY KEY,
    navigation_id INTEGER,
    url TEXT,
    navigation_start_ts INTEGER NOT NULL,
    dur INTEGER
);

CREATE TABLE IF NOT EXISTS chrome_web_content_interactions (
    id INTEGER PRIMARY KEY,
    interaction_type TEXT,
    ts INTEGER NOT NULL,
    dur INTEGER
);

CREATE VIEW IF NOT EXISTS chrome_interactions AS
SELECT
    id AS scoped_id,
    'chrome_page_loads' AS type,
    IFNULL(url, 'Page Load') AS name,
    navigation_start_ts AS ts,
    IFNULL(dur, -1) AS dur
FROM chrome_page_loads
UNION ALL
SELECT
    id AS scoped_id,
    'chrome_web_content_interactions' AS type,
    IFNULL(interaction_type, 'Interaction') AS name,
    ts,
    IFNULL(dur, -1) AS dur
FROM chrome_web_content_interactions;
";

static BUILTIN_MODULES: Lazy<Vec<(&'static str, &'static str)>> =
    Lazy::new(|| vec![(CHROME_INTERACTIONS_MODULE, CHROME_INTERACTIONS_SQL)]);

/// Module name -> SQL script table
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    scripts: AHashMap<String, String>,
}

impl ModuleRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, sql) in BUILTIN_MODULES.iter() {
            registry.register(*name, *sql);
        }
        registry
    }

    /// Add or replace a module
    pub fn register(&mut self, name: impl Into<String>, sql: impl Into<String>) {
        self.scripts.insert(name.into(), sql.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_include_interactions() {
        let registry = ModuleRegistry::with_builtins();
        assert!(registry.contains(CHROME_INTERACTIONS_MODULE));
        assert!(registry
            .get(CHROME_INTERACTIONS_MODULE)
            .map(|sql| sql.contains("CREATE VIEW IF NOT EXISTS chrome_interactions"))
            .unwrap_or(false));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ModuleRegistry::new();
        registry.register("custom.a", "SELECT 1;");
        registry.register("custom.a", "SELECT 2;");
        assert_eq!(registry.get("custom.a"), Some("SELECT 2;"));
        assert_eq!(registry.names(), vec!["custom.a"]);
    }
}
