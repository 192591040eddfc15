//! Outcome of a run

use trib_core::SkipReason;
use std::time::Duration;

/// An asset that failed, directly or through an upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAsset {
    pub name: String,
    pub error: String,
}

/// An asset that did not run, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAsset {
    pub name: String,
    pub reason: SkipReason,
}

/// Per-asset results of a run, each list in execution order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedAsset>,
    pub skipped: Vec<SkippedAsset>,
    /// Assets left unstarted by cancellation
    pub pending: Vec<String>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether every scheduled asset succeeded and nothing was cancelled
    pub fn is_success(&self) -> bool {
        !self.has_failures() && !self.cancelled
    }

    pub fn skipped_with(&self, reason: SkipReason) -> impl Iterator<Item = &str> {
        self.skipped
            .iter()
            .filter(move |s| s.reason == reason)
            .map(|s| s.name.as_str())
    }
}
