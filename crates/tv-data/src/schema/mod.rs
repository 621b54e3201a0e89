//! Row schemas describing the columns a track query must return
//!
//! Every schema starts from the named-slice base (`id`, `name`, `ts`, `dur`)
//! and can only grow from there, so any track can be fed through the base
//! slice mapping regardless of its extension columns.

use arrow::datatypes::{DataType, Field, Schema};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "name";
pub const TS_COLUMN: &str = "ts";
pub const DUR_COLUMN: &str = "dur";

/// Columns every row schema carries
pub const BASE_COLUMNS: [(&str, ColumnType); 4] = [
    (ID_COLUMN, ColumnType::Long),
    (NAME_COLUMN, ColumnType::Str),
    (TS_COLUMN, ColumnType::Timestamp),
    (DUR_COLUMN, ColumnType::Duration),
];

/// Primitive column types understood by the row decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// UTF-8 string
    Str,
    /// 64-bit signed integer
    Long,
    /// Duration in nanoseconds
    Duration,
    /// Timestamp in nanoseconds
    Timestamp,
}

impl ColumnType {
    /// Arrow type used when materializing this column
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Str => DataType::Utf8,
            ColumnType::Long | ColumnType::Duration | ColumnType::Timestamp => DataType::Int64,
        }
    }
}

/// Ordered column name -> type mapping for a query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchema {
    columns: IndexMap<String, ColumnType>,
}

impl RowSchema {
    /// The named-slice base schema
    pub fn named_slice() -> Self {
        let columns = BASE_COLUMNS
            .iter()
            .map(|(name, ty)| (name.to_string(), *ty))
            .collect();
        Self { columns }
    }

    /// Extend the schema with another column.
    ///
    /// Re-declaring an extension column replaces its type and keeps its
    /// position. Base columns (`id`, `name`, `ts`, `dur`) are fixed: naming
    /// one here leaves the schema unchanged.
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        if is_base_column(&name) {
            return self;
        }
        self.columns.insert(name, column_type);
        self
    }

    /// Iterate over `(name, type)` pairs in declaration order
    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnType)> + '_ {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Arrow schema used for materialized query results. All columns are
    /// nullable; the engine does not enforce NOT NULL.
    pub fn to_arrow(&self) -> Schema {
        let fields: Vec<Field> = self
            .columns()
            .map(|(name, ty)| Field::new(name, ty.arrow_type(), true))
            .collect();
        Schema::new(fields)
    }
}

impl Default for RowSchema {
    fn default() -> Self {
        Self::named_slice()
    }
}

fn is_base_column(name: &str) -> bool {
    BASE_COLUMNS.iter().any(|(base, _)| *base == name)
}
