//! Error types for trib-run

use thiserror::Error;
use trib_core::CoreError;

/// Errors that abort a run before or outside task execution.
///
/// Task failures are not errors at this level; they are recorded in the run
/// state and reported in the summary.
#[derive(Error, Debug)]
pub enum RunError {
    /// R001: Pipeline, configuration or state file error
    #[error("[R001] {0}")]
    Core(#[from] CoreError),

    /// R002: Stored run state describes a different pipeline
    #[error("[R002] Previous run state is not compatible with the current pipeline (expected hash {expected}, found {found})")]
    IncompatibleState { expected: String, found: String },

    /// R003: `--continue` without a recorded run
    #[error("[R003] No previous run state found in {dir}")]
    NoPreviousState { dir: String },

    /// R004: Target asset does not exist
    #[error("[R004] Asset not found: {name}")]
    UnknownAsset { name: String },
}

/// Result type alias for RunError
pub type RunResult<T> = Result<T, RunError>;
