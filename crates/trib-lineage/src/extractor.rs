//! Recursive column lineage extraction over a pipeline

use crate::error::{LineageError, LineageResult};
use crate::parser::{LineageParser, SqlLineageParser};
use std::collections::{HashMap, HashSet, VecDeque};
use trib_core::{Asset, Column, Pipeline, UpstreamColumn};
use trib_sql::{dialect_for_asset_type, Lineage, Schema};

/// Resolution state of an asset within one top-level call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Infers asset columns and column-level upstream edges from SQL.
///
/// The schema cache holds the columns of every asset that had columns when
/// [`table_schema`](Self::table_schema) was called. It is read, never written,
/// while resolving.
#[derive(Debug, Default)]
pub struct LineageExtractor<P = SqlLineageParser> {
    schema: Schema,
    parser: P,
}

impl LineageExtractor<SqlLineageParser> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: LineageParser> LineageExtractor<P> {
    /// Create an extractor with a custom analyzer
    pub fn with_parser(parser: P) -> Self {
        Self {
            schema: Schema::new(),
            parser,
        }
    }

    /// Build the schema cache from assets that already declare columns
    pub fn table_schema(&mut self, pipeline: &Pipeline) {
        for asset in pipeline.assets() {
            if !asset.columns.is_empty() {
                self.schema.insert_table(asset.name.as_str(), column_map(&asset.columns));
            }
        }
    }

    /// The schema cache
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolve the columns of an asset and, first, of all its upstreams.
    ///
    /// Best effort: an asset whose dialect or SQL cannot be analyzed is logged
    /// and left unresolved, and resolution continues with other branches.
    /// Assets that already have columns are never touched. A name that is
    /// not a pipeline asset is a no-op. An upstream cycle among unresolved
    /// assets fails with [`LineageError::CycleDetected`].
    pub fn column_lineage(&self, pipeline: &mut Pipeline, name: &str) -> LineageResult<()> {
        let mut visits = HashMap::new();
        let mut path = Vec::new();
        self.resolve(pipeline, name, &mut visits, &mut path)
    }

    /// Resolve every asset of the pipeline, upstreams first
    pub fn resolve_all(&self, pipeline: &mut Pipeline) -> LineageResult<()> {
        let names: Vec<String> = pipeline.asset_names().map(|n| n.to_string()).collect();
        let mut visits = HashMap::new();
        for name in names {
            let mut path = Vec::new();
            self.resolve(pipeline, &name, &mut visits, &mut path)?;
        }
        Ok(())
    }

    fn resolve(
        &self,
        pipeline: &mut Pipeline,
        name: &str,
        visits: &mut HashMap<String, Visit>,
        path: &mut Vec<String>,
    ) -> LineageResult<()> {
        let Some(asset) = pipeline.get_asset_by_name(name) else {
            return Ok(());
        };
        if !asset.columns.is_empty() {
            return Ok(());
        }

        match visits.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = path.iter().position(|p| p == name).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].iter().map(String::as_str).collect();
                cycle.push(name);
                return Err(LineageError::CycleDetected {
                    cycle: cycle.join(" -> "),
                });
            }
            None => {}
        }

        let upstreams: Vec<String> = asset.upstreams.iter().map(|u| u.to_string()).collect();
        visits.insert(name.to_string(), Visit::InProgress);
        path.push(name.to_string());

        for upstream in &upstreams {
            if pipeline.get_asset_by_name(upstream).is_none() {
                continue;
            }
            self.resolve(pipeline, upstream, visits, path)?;
        }

        if let Err(e) = self.parse_lineage(pipeline, name) {
            log::warn!("Skipping column lineage for '{}': {}", name, e);
        }

        path.pop();
        visits.insert(name.to_string(), Visit::Done);
        Ok(())
    }

    /// Analyze one asset's SQL and merge the result into its columns.
    ///
    /// Strict: dialect lookup and SQL analysis failures are returned. Upstreams
    /// are not resolved first; their current columns are used as they are.
    pub fn parse_lineage(&self, pipeline: &mut Pipeline, name: &str) -> LineageResult<()> {
        let mut asset = pipeline
            .get_asset_by_name(name)
            .cloned()
            .ok_or_else(|| LineageError::AssetNotFound {
                name: name.to_string(),
            })?;

        let parse_error = |source| LineageError::Parse {
            asset: name.to_string(),
            source,
        };
        let dialect = dialect_for_asset_type(&asset.asset_type).map_err(parse_error)?;
        let schema = self.schema_for(pipeline, &asset);
        let lineage = self
            .parser
            .column_lineage(&asset.sql, dialect, &schema)
            .map_err(parse_error)?;

        self.process_lineage_columns(pipeline, &mut asset, &lineage)?;

        if let Some(target) = pipeline.get_asset_by_name_mut(name) {
            target.columns = asset.columns;
        }
        Ok(())
    }

    /// The cache, overlaid with the current columns of the asset's upstreams
    fn schema_for(&self, pipeline: &Pipeline, asset: &Asset) -> Schema {
        let mut upstream_schema = Schema::new();
        for upstream in &asset.upstreams {
            if let Some(up) = pipeline.get_asset_by_name(upstream) {
                upstream_schema.insert_table(up.name.as_str(), column_map(&up.columns));
            }
        }
        self.schema.overlay(&upstream_schema)
    }

    /// Merge analyzer output into `asset`'s columns
    pub fn process_lineage_columns(
        &self,
        pipeline: &Pipeline,
        asset: &mut Asset,
        lineage: &Lineage,
    ) -> LineageResult<()> {
        for lineage_col in &lineage.columns {
            if lineage_col.name == "*" {
                // Full passthrough of upstream assets
                for upstream in &lineage_col.upstream {
                    if upstream.column != "*" {
                        continue;
                    }
                    let Some(upstream_asset) = pipeline.get_asset_by_name(&upstream.table) else {
                        continue;
                    };
                    for upstream_col in &upstream_asset.columns {
                        add_column_to_asset(
                            asset,
                            &upstream_col.name,
                            Some(upstream_asset.name.as_str()),
                            upstream_col,
                        )?;
                    }
                }
                continue;
            }

            for upstream in &lineage_col.upstream {
                if upstream.column == "*" || upstream.table == asset.name.as_str() {
                    continue;
                }

                let Some(upstream_asset) = pipeline.get_asset_by_name(&upstream.table) else {
                    // Table outside the pipeline
                    let table = upstream.table.to_lowercase();
                    let mut external = Column::new(upstream.column.clone(), table.clone());
                    external.push_upstream(UpstreamColumn {
                        asset: table.clone(),
                        column: upstream.column.clone(),
                        table,
                    });
                    add_column_to_asset(asset, &lineage_col.name, None, &external)?;
                    continue;
                };

                let placeholder;
                let upstream_col = match upstream_asset.get_column(&upstream.column) {
                    Some(col) => col,
                    None => {
                        let data_type = inherited_type(pipeline, upstream_asset, &upstream.column)
                            .unwrap_or_else(|| upstream.table.clone());
                        placeholder = Column::new(upstream.column.clone(), data_type);
                        &placeholder
                    }
                };
                add_column_to_asset(
                    asset,
                    &lineage_col.name,
                    Some(upstream_asset.name.as_str()),
                    upstream_col,
                )?;
            }
        }
        Ok(())
    }
}

/// Add a column named `col_name` to `asset`, derived from `upstream_col`.
///
/// * `*` is ignored; an empty name is an error.
/// * If the column exists, an edge to `upstream_asset.upstream_col` is added
///   (duplicates are dropped); without an upstream asset nothing changes.
/// * Otherwise a new column inherits the upstream type, entity attribute and
///   update-on-merge flag, with one edge to the upstream asset. Without an
///   upstream asset the upstream column is adopted as is, under `col_name`.
pub fn add_column_to_asset(
    asset: &mut Asset,
    col_name: &str,
    upstream_asset: Option<&str>,
    upstream_col: &Column,
) -> LineageResult<()> {
    if col_name.is_empty() {
        return Err(LineageError::InvalidArguments {
            message: format!("empty column name for asset '{}'", asset.name),
        });
    }
    if col_name == "*" {
        return Ok(());
    }

    if let Some(existing) = asset.get_column_mut(col_name) {
        if let Some(upstream) = upstream_asset {
            existing.push_upstream(UpstreamColumn::new(upstream, upstream_col.name.clone()));
        }
        return Ok(());
    }

    let column = match upstream_asset {
        Some(upstream) => {
            let mut column = Column::new(col_name, upstream_col.data_type.clone());
            column.entity_attribute = upstream_col.entity_attribute.clone();
            column.update_on_merge = upstream_col.update_on_merge;
            column.push_upstream(UpstreamColumn::new(upstream, upstream_col.name.clone()));
            column
        }
        None => Column {
            name: col_name.to_string(),
            ..upstream_col.clone()
        },
    };
    asset.columns.push(column);
    Ok(())
}

/// Column name to type pairs, for the schema
fn column_map(columns: &[Column]) -> Vec<(String, String)> {
    columns
        .iter()
        .map(|c| (c.name.clone(), c.data_type.clone()))
        .collect()
}

/// Type of the nearest same-named column among the transitive upstreams of `asset`
fn inherited_type(pipeline: &Pipeline, asset: &Asset, column: &str) -> Option<String> {
    let mut seen: HashSet<&str> = HashSet::from([asset.name.as_str()]);
    let mut queue: VecDeque<&str> = asset.upstreams.iter().map(|u| u.as_str()).collect();

    while let Some(name) = queue.pop_front() {
        if !seen.insert(name) {
            continue;
        }
        let Some(up) = pipeline.get_asset_by_name(name) else {
            continue;
        };
        if let Some(col) = up.get_column(column) {
            if !col.data_type.is_empty() {
                return Some(col.data_type.clone());
            }
        }
        queue.extend(up.upstreams.iter().map(|u| u.as_str()));
    }
    None
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
