//! Pipeline: the owned set of assets plus name lookup

use crate::asset::Asset;
use crate::asset_name::AssetName;
use crate::dag::AssetDag;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Default asset type when neither the asset nor the pipeline sets one
pub const DEFAULT_ASSET_TYPE: &str = "duckdb.sql";

/// Contents of `pipeline.yml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, used for the run state directory
    pub name: String,

    /// Asset type applied to assets that do not declare one
    #[serde(default = "default_asset_type")]
    pub default_type: String,

    /// DuckDB database file, relative to the pipeline root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// First date of the data window, used by full refreshes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Worker count when the run does not set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_parallelism: Option<usize>,
}

fn default_asset_type() -> String {
    DEFAULT_ASSET_TYPE.to_string()
}

impl PipelineConfig {
    /// Config with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_type: default_asset_type(),
            database: None,
            start_date: None,
            default_parallelism: None,
        }
    }
}

/// An ordered set of uniquely named assets
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub config: PipelineConfig,

    /// Directory the pipeline was loaded from
    pub root: PathBuf,

    assets: Vec<Asset>,
    index: HashMap<AssetName, usize>,
}

impl Pipeline {
    /// Create a pipeline, rejecting duplicate asset names
    pub fn new(config: PipelineConfig, root: impl Into<PathBuf>, assets: Vec<Asset>) -> CoreResult<Self> {
        let mut index = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            if index.insert(asset.name.clone(), i).is_some() {
                return Err(CoreError::DuplicateAsset {
                    name: asset.name.to_string(),
                });
            }
        }
        Ok(Self {
            config,
            root: root.into(),
            assets,
            index,
        })
    }

    /// Create an in-memory pipeline rooted at the current directory
    pub fn from_assets(name: impl Into<String>, assets: Vec<Asset>) -> CoreResult<Self> {
        Self::new(PipelineConfig::named(name), PathBuf::from("."), assets)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Look up an asset by its exact, case-sensitive name
    pub fn get_asset_by_name(&self, name: &str) -> Option<&Asset> {
        self.index.get(name).map(|&i| &self.assets[i])
    }

    /// Look up an asset by its exact name, mutably.
    ///
    /// Only non-name fields may be changed through the returned reference.
    pub fn get_asset_by_name_mut(&mut self, name: &str) -> Option<&mut Asset> {
        match self.index.get(name) {
            Some(&i) => self.assets.get_mut(i),
            None => None,
        }
    }

    /// Assets in load order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset_names(&self) -> impl Iterator<Item = &AssetName> {
        self.assets.iter().map(|a| &a.name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Build the asset DAG; external upstream names are left out
    pub fn dag(&self) -> CoreResult<AssetDag> {
        AssetDag::build(&self.assets)
    }

    /// Path of the DuckDB database file
    pub fn database_path(&self) -> PathBuf {
        match &self.config.database {
            Some(db) if Path::new(db).is_absolute() => PathBuf::from(db),
            Some(db) => self.root.join(db),
            None => self.root.join(format!("{}.duckdb", self.config.name)),
        }
    }

    /// Structural fingerprint of the pipeline.
    ///
    /// Covers asset names and their upstream edges only, independent of load
    /// order, SQL text and declared columns.
    pub fn compatibility_hash(&self) -> String {
        let mut names: Vec<&Asset> = self.assets.iter().collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));

        // every field is length-prefixed so names may contain any separator
        let mut hasher = Sha256::new();
        let mut field = |value: &str| {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        };
        for asset in names {
            let upstreams: BTreeSet<&str> = asset.upstreams.iter().map(|u| u.as_str()).collect();
            field(asset.name.as_str());
            field(&upstreams.len().to_string());
            for upstream in upstreams {
                field(upstream);
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
