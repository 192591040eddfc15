//! Lineage command implementation - column-level lineage across assets

use anyhow::{bail, Context, Result};
use serde::Serialize;
use trib_core::{Asset, Pipeline, RunConfig};
use trib_lineage::{infer_upstreams, LineageExtractor};

use crate::cli::{GlobalArgs, LineageArgs, LineageOutput};
use crate::commands::common::load_pipeline;
use crate::commands::template::SqlRenderer;

/// One column and where it comes from
#[derive(Debug, Serialize)]
struct ColumnReport<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    data_type: &'a str,
    upstreams: Vec<String>,
}

/// One asset with its resolved columns
#[derive(Debug, Serialize)]
struct AssetReport<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    asset_type: &'a str,
    upstreams: Vec<&'a str>,
    columns: Vec<ColumnReport<'a>>,
}

impl<'a> AssetReport<'a> {
    fn new(asset: &'a Asset) -> Self {
        Self {
            name: &asset.name,
            asset_type: &asset.asset_type,
            upstreams: asset.upstreams.iter().map(|u| u.as_str()).collect(),
            columns: asset
                .columns
                .iter()
                .map(|c| ColumnReport {
                    name: &c.name,
                    data_type: &c.data_type,
                    upstreams: c
                        .upstreams
                        .iter()
                        .map(|u| format!("{}.{}", u.asset, u.column))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Execute the lineage command
pub async fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let mut pipeline = load_pipeline(&args.path)?;
    for name in &args.assets {
        if pipeline.get_asset_by_name(name).is_none() {
            bail!("Asset not found: {}", name);
        }
    }

    resolve_lineage(&mut pipeline, global.verbose)?;

    let reports: Vec<AssetReport> = pipeline
        .assets()
        .iter()
        .filter(|a| args.assets.is_empty() || args.assets.iter().any(|n| n == a.name.as_str()))
        .map(AssetReport::new)
        .collect();

    match args.output {
        LineageOutput::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        LineageOutput::Table => print_table(&reports),
    }
    Ok(())
}

/// Render templates, infer asset upstreams from SQL, then resolve columns
fn resolve_lineage(pipeline: &mut Pipeline, verbose: bool) -> Result<()> {
    let renderer = SqlRenderer::new();
    let window = RunConfig::default();
    let names: Vec<String> = pipeline
        .assets()
        .iter()
        .filter(|a| !a.is_python())
        .map(|a| a.name.to_string())
        .collect();
    for name in names {
        let Some(asset) = pipeline.get_asset_by_name_mut(&name) else {
            continue;
        };
        match renderer.render(&asset.sql, &window) {
            Ok(sql) => asset.sql = sql,
            Err(e) => log::warn!("Leaving template of '{}' unrendered: {:#}", name, e),
        }
    }

    let inferred = infer_upstreams(pipeline);
    if verbose {
        eprintln!("[verbose] Inferred {} upstream reference(s) from SQL", inferred);
    }

    let mut extractor = LineageExtractor::new();
    extractor.table_schema(pipeline);
    extractor
        .resolve_all(pipeline)
        .context("Failed to resolve column lineage")?;
    Ok(())
}

/// Print lineage as a human-readable table
fn print_table(reports: &[AssetReport]) {
    let rows: usize = reports.iter().map(|r| r.columns.len()).sum();
    if rows == 0 {
        println!("No column lineage found.");
        return;
    }

    println!("{:<30} {:<25} {:<15} UPSTREAM", "ASSET", "COLUMN", "TYPE");
    println!("{}", "-".repeat(100));
    for report in reports {
        for column in &report.columns {
            let upstream = if column.upstreams.is_empty() {
                "-".to_string()
            } else {
                column.upstreams.join(", ")
            };
            println!(
                "{:<30} {:<25} {:<15} {}",
                report.name, column.name, column.data_type, upstream
            );
        }
    }
    println!("\n{} column(s) across {} asset(s).", rows, reports.len());
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
