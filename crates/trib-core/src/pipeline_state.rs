//! Durable run state for resumable runs
//!
//! The state of a run is rewritten after every asset reaches a terminal
//! status, so an interrupted run can be resumed with `--continue`. State files
//! live under `<pipeline>/logs/runs/<pipeline name>/`, one file per run.

use crate::error::CoreResult;
use crate::run_config::RunConfig;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Version of the state file layout
pub const STATE_VERSION: &str = "1.0.0";

/// Timestamp format of state file names
const RUN_FILE_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Status of one asset within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl AssetStatus {
    /// Whether the asset has finished for this run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssetStatus::Succeeded | AssetStatus::Failed | AssetStatus::Skipped
        )
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Running => "running",
            AssetStatus::Succeeded => "succeeded",
            AssetStatus::Failed => "failed",
            AssetStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why an asset was not executed in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Excluded by targets, `--downstream`, `--tag` or `--exclude-tag`
    Filtered,
    /// Completed by the run being continued
    PreviouslySucceeded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Filtered => f.write_str("filtered"),
            SkipReason::PreviouslySucceeded => f.write_str("succeeded in previous run"),
        }
    }
}

/// Build identity of the tool that wrote a state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "OS")]
    pub os: String,
}

impl Metadata {
    /// Identity of the running build
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

/// Status record for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineAssetState {
    pub name: String,
    pub status: AssetStatus,

    /// Set only for skipped assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl PipelineAssetState {
    /// Whether a continued run can treat the asset as done
    pub fn is_complete(&self) -> bool {
        match self.status {
            AssetStatus::Succeeded => true,
            AssetStatus::Skipped => self.skip_reason == Some(SkipReason::PreviouslySucceeded),
            _ => false,
        }
    }
}

/// The durable record of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineState {
    pub parameters: RunConfig,
    pub metadata: Metadata,
    pub state: Vec<PipelineAssetState>,
    pub version: String,
    pub compatibility_hash: String,
}

impl PipelineState {
    /// Fresh state with every asset pending
    pub fn new<I, S>(parameters: RunConfig, compatibility_hash: String, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameters,
            metadata: Metadata::current(),
            state: assets
                .into_iter()
                .map(|name| PipelineAssetState {
                    name: name.into(),
                    status: AssetStatus::Pending,
                    skip_reason: None,
                })
                .collect(),
            version: STATE_VERSION.to_string(),
            compatibility_hash,
        }
    }

    /// Status recorded for an asset, if any
    pub fn status_of(&self, name: &str) -> Option<AssetStatus> {
        self.state.iter().find(|s| s.name == name).map(|s| s.status)
    }

    /// Whether the asset finished in this run without needing another attempt
    pub fn is_complete(&self, name: &str) -> bool {
        self.state
            .iter()
            .find(|s| s.name == name)
            .is_some_and(PipelineAssetState::is_complete)
    }

    /// Record an asset's status, adding the asset if it is not tracked yet
    pub fn set_status(&mut self, name: &str, status: AssetStatus) {
        self.record(name, status, None);
    }

    /// Record an asset as skipped for `reason`
    pub fn set_skipped(&mut self, name: &str, reason: SkipReason) {
        self.record(name, AssetStatus::Skipped, Some(reason));
    }

    fn record(&mut self, name: &str, status: AssetStatus, skip_reason: Option<SkipReason>) {
        match self.state.iter_mut().find(|s| s.name == name) {
            Some(entry) => {
                entry.status = status;
                entry.skip_reason = skip_reason;
            }
            None => self.state.push(PipelineAssetState {
                name: name.to_string(),
                status,
                skip_reason,
            }),
        }
    }

    /// Whether this state was written for a pipeline with the given shape
    pub fn is_compatible_with(&self, compatibility_hash: &str) -> bool {
        self.compatibility_hash == compatibility_hash
    }

    /// Number of assets with the given status
    pub fn count(&self, status: AssetStatus) -> usize {
        self.state.iter().filter(|s| s.status == status).count()
    }

    /// Load state from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| crate::CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save state to a file path atomically
    ///
    /// Uses write-to-temp-then-rename so readers never observe a partial file.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}

/// Directory of run state files for one pipeline
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<root>/logs/runs/<pipeline name>`
    pub fn for_pipeline(root: &Path, pipeline_name: &str) -> Self {
        Self::new(root.join("logs").join("runs").join(pipeline_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a run started at `started_at`
    pub fn run_path(&self, started_at: NaiveDateTime) -> PathBuf {
        self.dir
            .join(format!("{}.json", started_at.format(RUN_FILE_FORMAT)))
    }

    /// Most recent state file, by timestamped file name
    pub fn latest(&self) -> CoreResult<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let mut latest: Option<PathBuf> = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let newer = match &latest {
                Some(current) => path.file_name() > current.file_name(),
                None => true,
            };
            if newer {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    /// Load the most recent state, if any run was recorded
    pub fn load_latest(&self) -> CoreResult<Option<PipelineState>> {
        match self.latest()? {
            Some(path) => {
                log::debug!("Loading run state from {}", path.display());
                PipelineState::load(&path).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_state_test.rs"]
mod tests;
