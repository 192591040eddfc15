//! Table schemas handed to the lineage analyzer

use std::collections::HashMap;

/// A column of a known table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: String,
}

/// Known tables and their ordered columns.
///
/// Table lookup is exact first, then case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: HashMap<String, Vec<SchemaColumn>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Columns with empty names are dropped; a table that
    /// ends up with no columns is not registered.
    pub fn insert_table<I, N, T>(&mut self, table: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let columns: Vec<SchemaColumn> = columns
            .into_iter()
            .map(|(name, data_type)| SchemaColumn {
                name: name.into(),
                data_type: data_type.into(),
            })
            .filter(|c| !c.name.is_empty())
            .collect();
        if !columns.is_empty() {
            self.tables.insert(table.into(), columns);
        }
    }

    /// Look up a table, returning its registered name and columns
    pub fn table(&self, name: &str) -> Option<(&str, &[SchemaColumn])> {
        if let Some((key, cols)) = self.tables.get_key_value(name) {
            return Some((key.as_str(), cols.as_slice()));
        }
        self.tables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, cols)| (key.as_str(), cols.as_slice()))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Copy of this schema with `other`'s tables added or replacing existing ones
    pub fn overlay(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();
        for (name, cols) in &other.tables {
            merged.tables.insert(name.clone(), cols.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
