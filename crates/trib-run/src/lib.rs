//! trib-run - Scheduler and resumable run state machine for Tributary
//!
//! Turns a pipeline and a run configuration into a plan of tasks, executes
//! them over a bounded worker pool in dependency order, and persists the run
//! state after every completed task so a failed run can be continued.

pub mod error;
pub mod executor;
pub mod plan;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod summary;

pub use error::{RunError, RunResult};
pub use executor::{AssetExecutor, ExecutionError, TaskContext, TaskId};
pub use plan::{PlannedTask, RunPlan};
pub use runner::{RunOutcome, Runner};
pub use scheduler::Scheduler;
pub use state::StateRecorder;
pub use summary::{FailedAsset, RunSummary, SkippedAsset};
pub use trib_core::SkipReason;
