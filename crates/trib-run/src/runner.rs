//! A complete run: plan, seed state, execute, persist

use crate::error::{RunError, RunResult};
use crate::executor::AssetExecutor;
use crate::plan::RunPlan;
use crate::scheduler::Scheduler;
use crate::state::StateRecorder;
use crate::summary::RunSummary;
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use trib_core::{Pipeline, PipelineState, RunConfig, StateStore};

/// Runs pipelines against an executor, recording state in a [`StateStore`]
pub struct Runner {
    scheduler: Scheduler,
    store: StateStore,
}

/// What a run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub state: PipelineState,
    pub state_path: PathBuf,
}

impl Runner {
    pub fn new(executor: Arc<dyn AssetExecutor>, store: StateStore) -> Self {
        Self {
            scheduler: Scheduler::new(executor),
            store,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.scheduler = self.scheduler.with_cancel_flag(cancel);
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.scheduler.cancel_flag()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Plan and execute a run of `pipeline`.
    ///
    /// With `config.continue_run`, the newest recorded state seeds the run and
    /// must have been written for the same pipeline shape. Task failures are
    /// reported in the outcome, not as errors.
    pub async fn run(&self, pipeline: &Pipeline, config: RunConfig) -> RunResult<RunOutcome> {
        config.validate()?;

        let previous = if config.continue_run {
            let state = self
                .store
                .load_latest()?
                .ok_or_else(|| RunError::NoPreviousState {
                    dir: self.store.dir().display().to_string(),
                })?;
            Some(state)
        } else {
            None
        };

        let plan = RunPlan::build(pipeline, &config, previous.as_ref())?;
        log::info!(
            "Planned {} tasks for pipeline '{}', {} assets skipped",
            plan.len(),
            pipeline.name(),
            plan.skipped().len()
        );

        let mut state = PipelineState::new(
            config.clone(),
            plan.compatibility_hash().to_string(),
            pipeline.asset_names().map(|n| n.to_string()),
        );
        for (name, reason) in plan.skipped() {
            state.set_skipped(name, *reason);
        }

        let state_path = self.store.run_path(Local::now().naive_local());
        let mut recorder = StateRecorder::new(state, &state_path);
        recorder.persist();

        let summary = self
            .scheduler
            .execute(pipeline, &plan, Arc::new(config), &mut recorder)
            .await;

        Ok(RunOutcome {
            summary,
            state: recorder.into_state(),
            state_path,
        })
    }
}
