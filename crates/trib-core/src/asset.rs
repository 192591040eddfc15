//! Asset and column data model

use crate::asset_name::AssetName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A column-level provenance edge.
///
/// References the upstream asset and column by name. The referenced asset may
/// not exist in the pipeline (external tables are recorded too).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamColumn {
    /// Upstream asset name
    pub asset: String,

    /// Upstream column name
    pub column: String,

    /// Physical table the column was read from
    #[serde(default)]
    pub table: String,
}

impl UpstreamColumn {
    /// Create an edge whose table is the asset name itself
    pub fn new(asset: impl Into<String>, column: impl Into<String>) -> Self {
        let asset = asset.into();
        Self {
            table: asset.clone(),
            asset,
            column: column.into(),
        }
    }

    fn same_edge(&self, other: &UpstreamColumn) -> bool {
        self.asset == other.asset && self.column == other.column
    }
}

/// Insertion-ordered set of upstream edges, keyed by (asset, column).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UpstreamColumn>", into = "Vec<UpstreamColumn>")]
pub struct UpstreamColumns(Vec<UpstreamColumn>);

impl UpstreamColumns {
    /// Create an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert an edge. Returns `false` and drops the edge if an edge with the
    /// same (asset, column) pair is already present.
    pub fn push(&mut self, edge: UpstreamColumn) -> bool {
        if self.0.iter().any(|e| e.same_edge(&edge)) {
            return false;
        }
        self.0.push(edge);
        true
    }

    /// Whether an edge to `asset.column` exists
    pub fn contains(&self, asset: &str, column: &str) -> bool {
        self.0.iter().any(|e| e.asset == asset && e.column == column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UpstreamColumn> {
        self.0.iter()
    }
}

impl From<Vec<UpstreamColumn>> for UpstreamColumns {
    fn from(edges: Vec<UpstreamColumn>) -> Self {
        let mut set = Self::new();
        for edge in edges {
            set.push(edge);
        }
        set
    }
}

impl From<UpstreamColumns> for Vec<UpstreamColumn> {
    fn from(set: UpstreamColumns) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a UpstreamColumns {
    type Item = &'a UpstreamColumn;
    type IntoIter = std::slice::Iter<'a, UpstreamColumn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Business entity/attribute a column maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttribute {
    pub entity: String,
    pub attribute: String,
}

/// A declared column check (not_null, unique, accepted_values, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCheck {
    /// Check name
    pub name: String,

    /// Check argument (allowed values, bound, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,

    /// Whether a failure of this check fails the asset
    #[serde(default = "default_blocking")]
    pub blocking: bool,
}

impl ColumnCheck {
    /// Create a blocking check without an argument
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            blocking: true,
        }
    }
}

/// A custom SQL check; the query must return `value` (default 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCheck {
    pub name: String,

    pub query: String,

    #[serde(default)]
    pub value: i64,

    #[serde(default = "default_blocking")]
    pub blocking: bool,
}

fn default_blocking() -> bool {
    true
}

/// A column of an asset, declared or inferred by lineage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Dialect-neutral type tag
    #[serde(rename = "type", default)]
    pub data_type: String,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub checks: Vec<ColumnCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_attribute: Option<EntityAttribute>,

    #[serde(default)]
    pub update_on_merge: bool,

    /// Column-level provenance edges
    #[serde(default)]
    pub upstreams: UpstreamColumns,
}

impl Column {
    /// Create a column with a name and type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    /// Add a provenance edge, ignoring duplicates. Returns whether it was added.
    pub fn push_upstream(&mut self, edge: UpstreamColumn) -> bool {
        self.upstreams.push(edge)
    }
}

/// How a SQL asset is materialized in the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    #[default]
    Table,
    View,
}

/// A named unit of data-producing work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset name, unique within the pipeline
    pub name: AssetName,

    /// Asset type, selects the SQL dialect and execution engine (`duckdb.sql`, `python`, ...)
    #[serde(rename = "type")]
    pub asset_type: String,

    #[serde(default)]
    pub description: String,

    /// Executable content: SQL text or script source
    #[serde(default)]
    pub sql: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Upstream asset references, in declaration order
    #[serde(default)]
    pub upstreams: Vec<AssetName>,

    #[serde(default)]
    pub materialization: Materialization,

    /// Declared or inferred columns; empty means unresolved
    #[serde(default)]
    pub columns: Vec<Column>,

    #[serde(default)]
    pub custom_checks: Vec<CustomCheck>,

    /// Source file the asset was loaded from
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Asset {
    /// Create an asset with a name, type and SQL body
    pub fn new(name: AssetName, asset_type: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name,
            asset_type: asset_type.into(),
            description: String::new(),
            sql: sql.into(),
            tags: Vec::new(),
            upstreams: Vec::new(),
            materialization: Materialization::default(),
            columns: Vec::new(),
            custom_checks: Vec::new(),
            path: None,
        }
    }

    /// Find a column by exact name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a column by exact name, mutably
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the asset declares any column or custom checks
    pub fn has_checks(&self) -> bool {
        !self.custom_checks.is_empty() || self.columns.iter().any(|c| !c.checks.is_empty())
    }

    /// Add an upstream reference unless it is already present
    pub fn add_upstream(&mut self, name: AssetName) {
        if !self.upstreams.contains(&name) {
            self.upstreams.push(name);
        }
    }

    /// Whether this is a script (non-SQL) asset
    pub fn is_python(&self) -> bool {
        self.asset_type == "python"
    }
}

#[cfg(test)]
#[path = "asset_test.rs"]
mod tests;
