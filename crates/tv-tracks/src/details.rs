//! Detail panel descriptors and the kind-keyed resolver that picks them
//!
//! A track classifies an activated slice into a kind, then looks the kind
//! up in a [`PanelResolver`]. Kinds without an entry get the resolver's
//! fallback, so resolution never fails.

use std::collections::HashMap;
use std::hash::Hash;
use serde::{Deserialize, Serialize};

/// Panel kind shown for slices no specialized panel claims
pub const GENERIC_SLICE_DETAILS_KIND: &str = "generic-panel";

/// Configuration handed to a detail panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsPanelConfig {
    /// Table the panel reads the slice back from
    pub sql_table_name: String,
    pub title: String,
}

/// Which detail panel to open and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsPanel {
    pub kind: String,
    pub config: DetailsPanelConfig,
}

/// Builds a panel for a given table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelBuilder {
    kind: &'static str,
    title: &'static str,
}

impl PanelBuilder {
    pub const fn new(kind: &'static str, title: &'static str) -> Self {
        Self { kind, title }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn build(&self, sql_table_name: &str) -> DetailsPanel {
        DetailsPanel {
            kind: self.kind.to_string(),
            config: DetailsPanelConfig {
                sql_table_name: sql_table_name.to_string(),
                title: self.title.to_string(),
            },
        }
    }
}

/// Dispatch table from a slice kind to its panel, with a fallback
#[derive(Debug, Clone)]
pub struct PanelResolver<K> {
    builders: HashMap<K, PanelBuilder>,
    fallback: PanelBuilder,
}

impl<K: Copy + Eq + Hash> PanelResolver<K> {
    pub fn new(fallback: PanelBuilder) -> Self {
        Self {
            builders: HashMap::new(),
            fallback,
        }
    }

    /// Add or replace the panel for `kind`
    pub fn with_panel(mut self, kind: K, builder: PanelBuilder) -> Self {
        self.builders.insert(kind, builder);
        self
    }

    pub fn has_panel(&self, kind: K) -> bool {
        self.builders.contains_key(&kind)
    }

    pub fn fallback(&self) -> &PanelBuilder {
        &self.fallback
    }

    /// Panel for `kind` over `sql_table_name`
    pub fn resolve(&self, kind: K, sql_table_name: &str) -> DetailsPanel {
        self.builders
            .get(&kind)
            .unwrap_or(&self.fallback)
            .build(sql_table_name)
    }
}
