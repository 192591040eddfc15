//! Asset-level upstream inference from table references

use trib_core::{AssetName, Pipeline};
use trib_sql::{dialect_for_asset_type, referenced_tables};

/// Add upstream references for pipeline assets that an asset's SQL reads from.
///
/// Table names match asset names exactly, then case-insensitively; schema
/// qualified references match on the full name. Assets with an unknown
/// dialect are skipped, unparseable SQL is logged. Returns the number of
/// references added.
pub fn infer_upstreams(pipeline: &mut Pipeline) -> usize {
    let names: Vec<AssetName> = pipeline.asset_names().cloned().collect();
    let mut added = 0;

    for name in &names {
        let Some(asset) = pipeline.get_asset_by_name(name) else {
            continue;
        };
        let Ok(dialect) = dialect_for_asset_type(&asset.asset_type) else {
            continue;
        };
        let tables = match referenced_tables(&asset.sql, dialect) {
            Ok(tables) => tables,
            Err(e) => {
                log::warn!("Could not infer upstreams of '{}': {}", name, e);
                continue;
            }
        };

        let found: Vec<AssetName> = tables
            .iter()
            .filter_map(|table| match_asset(&names, table))
            .filter(|upstream| *upstream != name)
            .cloned()
            .collect();

        if let Some(asset) = pipeline.get_asset_by_name_mut(name) {
            for upstream in found {
                if !asset.upstreams.contains(&upstream) {
                    log::debug!("Inferred upstream '{}' for '{}'", upstream, name);
                    asset.add_upstream(upstream);
                    added += 1;
                }
            }
        }
    }
    added
}

fn match_asset<'a>(names: &'a [AssetName], table: &str) -> Option<&'a AssetName> {
    names
        .iter()
        .find(|n| n.as_str() == table)
        .or_else(|| names.iter().find(|n| n.as_str().eq_ignore_ascii_case(table)))
}

#[cfg(test)]
#[path = "upstreams_test.rs"]
mod tests;
