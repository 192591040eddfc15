//! Pipeline discovery and asset loading
//!
//! Layout:
//!
//! ```text
//! <pipeline>/
//!   pipeline.yml
//!   assets/**/<asset>.sql     SQL asset
//!   assets/**/<asset>.py      python asset
//!   assets/**/<asset>.yml     optional definition next to the asset file
//! ```

use crate::asset::{Asset, Column, CustomCheck, Materialization};
use crate::asset_name::AssetName;
use crate::error::{CoreError, CoreResult};
use crate::pipeline::{Pipeline, PipelineConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Asset definition file contents; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssetDefinition {
    #[serde(default)]
    name: Option<String>,

    #[serde(rename = "type", default)]
    asset_type: Option<String>,

    #[serde(default)]
    description: String,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    depends: Vec<String>,

    #[serde(default)]
    materialization: Materialization,

    #[serde(default)]
    columns: Vec<Column>,

    #[serde(default)]
    custom_checks: Vec<CustomCheck>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CoreError + '_ {
    move |source| CoreError::IoWithPath {
        path: path.display().to_string(),
        source,
    }
}

fn file_extension_str(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

/// Find the pipeline definition file in a directory
fn find_pipeline_file(root: &Path) -> Option<PathBuf> {
    ["pipeline.yml", "pipeline.yaml"]
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.is_file())
}

/// Recursively collect `.sql` and `.py` files
fn discover_asset_files(dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if path.is_dir() {
            discover_asset_files(&path, files)?;
        } else if matches!(file_extension_str(&path), "sql" | "py") {
            files.push(path);
        }
    }
    Ok(())
}

/// Definition file next to an asset file, if present
fn definition_path(asset_path: &Path) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| asset_path.with_extension(ext))
        .find(|p| p.is_file())
}

fn load_asset(path: &Path, config: &PipelineConfig) -> CoreResult<Asset> {
    let body = std::fs::read_to_string(path).map_err(io_error(path))?;

    let definition = match definition_path(path) {
        Some(def_path) => {
            let content = std::fs::read_to_string(&def_path).map_err(io_error(&def_path))?;
            serde_yaml::from_str::<AssetDefinition>(&content).map_err(|e| {
                CoreError::DefinitionParse {
                    path: def_path.display().to_string(),
                    message: e.to_string(),
                }
            })?
        }
        None => AssetDefinition::default(),
    };

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let raw_name = definition.name.unwrap_or_else(|| stem.to_string());
    let name = AssetName::try_new(raw_name).ok_or_else(|| CoreError::EmptyName {
        context: format!("asset name for {}", path.display()),
    })?;

    let asset_type = match definition.asset_type {
        Some(t) => t,
        None if file_extension_str(path) == "py" => "python".to_string(),
        None => config.default_type.clone(),
    };

    let mut asset = Asset::new(name, asset_type, body);
    asset.description = definition.description;
    asset.tags = definition.tags;
    asset.materialization = definition.materialization;
    asset.columns = definition.columns;
    asset.custom_checks = definition.custom_checks;
    asset.path = Some(path.to_path_buf());
    for dep in definition.depends {
        let upstream = AssetName::try_new(dep).ok_or_else(|| CoreError::EmptyName {
            context: format!("depends of {}", asset.name),
        })?;
        asset.add_upstream(upstream);
    }

    Ok(asset)
}

impl Pipeline {
    /// Load a pipeline from a directory
    pub fn load(path: &Path) -> CoreResult<Self> {
        let root = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let pipeline_file = find_pipeline_file(&root).ok_or_else(|| CoreError::PipelineNotFound {
            path: root.display().to_string(),
        })?;
        let content = std::fs::read_to_string(&pipeline_file).map_err(io_error(&pipeline_file))?;
        let config: PipelineConfig =
            serde_yaml::from_str(&content).map_err(|e| CoreError::DefinitionParse {
                path: pipeline_file.display().to_string(),
                message: e.to_string(),
            })?;
        if config.name.trim().is_empty() {
            return Err(CoreError::EmptyName {
                context: pipeline_file.display().to_string(),
            });
        }

        let mut files = Vec::new();
        let assets_dir = root.join("assets");
        if assets_dir.is_dir() {
            discover_asset_files(&assets_dir, &mut files)?;
        } else {
            log::warn!("No assets directory in {}", root.display());
        }
        files.sort();

        let assets = files
            .iter()
            .map(|f| load_asset(f, &config))
            .collect::<CoreResult<Vec<_>>>()?;
        log::debug!("Loaded {} assets from {}", assets.len(), root.display());

        Pipeline::new(config, root, assets)
    }
}

#[cfg(test)]
#[path = "loading_test.rs"]
mod tests;
