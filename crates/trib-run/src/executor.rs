//! The task execution seam

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use trib_core::{Asset, AssetName, RunConfig, TaskKind};

/// One unit of schedulable work: a task kind applied to an asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub asset: AssetName,
    pub kind: TaskKind,
}

impl TaskId {
    pub fn new(asset: AssetName, kind: TaskKind) -> Self {
        Self { asset, kind }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset, self.kind)
    }
}

/// Everything an executor receives for one task
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub asset: Arc<Asset>,
    pub kind: TaskKind,
    pub config: Arc<RunConfig>,
}

/// A failed task, with a human readable reason
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any displayable error
    pub fn from_error(err: impl fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

/// Executes tasks for the scheduler
#[async_trait]
pub trait AssetExecutor: Send + Sync {
    async fn execute(&self, ctx: &TaskContext) -> Result<(), ExecutionError>;
}
