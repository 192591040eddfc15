//! Durable state of the run in progress

use std::path::{Path, PathBuf};
use trib_core::{AssetStatus, PipelineState};

/// Owns the state of the current run and rewrites its file on every change
/// of a terminal status.
///
/// Only the scheduler loop writes through a recorder, so writes never
/// interleave.
#[derive(Debug)]
pub struct StateRecorder {
    state: PipelineState,
    path: PathBuf,
}

impl StateRecorder {
    pub fn new(state: PipelineState, path: impl Into<PathBuf>) -> Self {
        Self {
            state,
            path: path.into(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set an asset's status; terminal statuses are persisted immediately
    pub fn record(&mut self, asset: &str, status: AssetStatus) {
        if self.state.status_of(asset) == Some(status) {
            return;
        }
        self.state.set_status(asset, status);
        if status.is_terminal() {
            self.persist();
        }
    }

    /// Write the state file. A failed write is logged, the run goes on.
    pub fn persist(&self) {
        match self.state.save(&self.path) {
            Ok(()) => log::debug!("Saved run state to {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to save run state to {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }
}
