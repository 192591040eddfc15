//! Ready-queue dispatch over a bounded worker pool

use crate::executor::{AssetExecutor, ExecutionError, TaskContext};
use crate::plan::{PlannedTask, RunPlan};
use crate::state::StateRecorder;
use crate::summary::{FailedAsset, RunSummary, SkippedAsset};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use trib_core::{Asset, AssetName, AssetStatus, Pipeline, RunConfig};

/// Executes a [`RunPlan`] with at most `RunConfig::workers` tasks in flight.
///
/// A task starts only after all of its dependencies succeeded. When a task
/// fails, every task depending on it, directly or not, fails without running.
/// Setting the cancel flag stops new tasks from starting; running tasks
/// finish.
pub struct Scheduler {
    executor: Arc<dyn AssetExecutor>,
    cancel: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(executor: Arc<dyn AssetExecutor>) -> Self {
        Self {
            executor,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing cancel flag, e.g. one set by a signal handler
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        plan: &RunPlan,
        config: Arc<RunConfig>,
        recorder: &mut StateRecorder,
    ) -> RunSummary {
        let start = Instant::now();
        let tasks = plan.tasks();
        let workers = config.workers.max(1);

        let assets: HashMap<&str, Arc<Asset>> = plan
            .scheduled_assets()
            .into_iter()
            .filter_map(|name| pipeline.get_asset_by_name(name))
            .map(|asset| (asset.name.as_str(), Arc::new(asset.clone())))
            .collect();

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for &dep in &task.deps {
                dependents[dep].push(i);
            }
        }
        let mut waiting: Vec<usize> = tasks.iter().map(|t| t.deps.len()).collect();
        let mut ready: VecDeque<usize> = (0..tasks.len()).filter(|&i| waiting[i] == 0).collect();
        let mut progress = Progress::new(tasks, recorder);
        let mut running = JoinSet::new();

        loop {
            while running.len() < workers && !self.is_cancelled() {
                let Some(i) = ready.pop_front() else {
                    break;
                };
                let id = &tasks[i].id;
                let Some(asset) = assets.get(id.asset.as_str()) else {
                    progress.finish(i, Err(format!("asset '{}' is not in the pipeline", id.asset)));
                    continue;
                };

                log::info!("Starting {}", id);
                progress.start(i);
                let ctx = TaskContext {
                    asset: Arc::clone(asset),
                    kind: id.kind,
                    config: Arc::clone(&config),
                };
                let executor = Arc::clone(&self.executor);
                running.spawn(async move {
                    // Isolate panics so the slot is always reported back
                    let handle = tokio::spawn(async move { executor.execute(&ctx).await });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(ExecutionError::new(format!("task aborted: {}", e))),
                    };
                    (i, result)
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (i, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    log::warn!("Task join error: {}", e);
                    continue;
                }
            };

            let id = &tasks[i].id;
            match result {
                Ok(()) => {
                    log::info!("Finished {}", id);
                    progress.finish(i, Ok(()));
                    for &d in &dependents[i] {
                        waiting[d] -= 1;
                        if waiting[d] == 0 && !progress.is_finished(d) {
                            ready.push_back(d);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("{} failed: {}", id, e);
                    progress.finish(i, Err(e.message));
                    let reason = format!("upstream '{}' failed", id.asset);
                    let mut stack = dependents[i].clone();
                    while let Some(d) = stack.pop() {
                        if progress.is_finished(d) {
                            continue;
                        }
                        progress.finish(d, Err(reason.clone()));
                        stack.extend(dependents[d].iter().copied());
                    }
                }
            }
        }

        let cancelled = self.is_cancelled() && progress.has_unfinished();
        if cancelled {
            log::warn!("Run cancelled, unstarted tasks left pending");
        }
        let mut summary = progress.into_summary(plan);
        summary.cancelled = cancelled;
        summary.duration = start.elapsed();
        summary
    }
}

/// Task outcomes and their per-asset aggregation
struct Progress<'a> {
    tasks: &'a [PlannedTask],
    outcomes: Vec<Option<Result<(), String>>>,
    remaining: HashMap<AssetName, usize>,
    errors: HashMap<AssetName, String>,
    recorder: &'a mut StateRecorder,
}

impl<'a> Progress<'a> {
    fn new(tasks: &'a [PlannedTask], recorder: &'a mut StateRecorder) -> Self {
        let mut remaining = HashMap::new();
        for task in tasks {
            *remaining.entry(task.id.asset.clone()).or_insert(0) += 1;
        }
        Self {
            tasks,
            outcomes: vec![None; tasks.len()],
            remaining,
            errors: HashMap::new(),
            recorder,
        }
    }

    fn is_finished(&self, i: usize) -> bool {
        self.outcomes[i].is_some()
    }

    fn has_unfinished(&self) -> bool {
        self.outcomes.iter().any(Option::is_none)
    }

    fn start(&mut self, i: usize) {
        self.recorder
            .record(&self.tasks[i].id.asset, AssetStatus::Running);
    }

    fn finish(&mut self, i: usize, outcome: Result<(), String>) {
        let asset = &self.tasks[i].id.asset;
        if let Err(message) = &outcome {
            self.errors
                .entry(asset.clone())
                .or_insert_with(|| message.clone());
        }
        self.outcomes[i] = Some(outcome);

        let Some(remaining) = self.remaining.get_mut(asset) else {
            return;
        };
        *remaining -= 1;
        if *remaining == 0 {
            let status = if self.errors.contains_key(asset) {
                AssetStatus::Failed
            } else {
                AssetStatus::Succeeded
            };
            self.recorder.record(asset, status);
        }
    }

    fn into_summary(mut self, plan: &RunPlan) -> RunSummary {
        let mut summary = RunSummary::default();
        for name in plan.scheduled_assets() {
            let unfinished = self.remaining.get(name).copied().unwrap_or(0) > 0;
            if let Some(error) = self.errors.get(name) {
                summary.failed.push(FailedAsset {
                    name: name.to_string(),
                    error: error.clone(),
                });
                if unfinished {
                    self.recorder.record(name, AssetStatus::Failed);
                }
            } else if unfinished {
                summary.pending.push(name.to_string());
                self.recorder.record(name, AssetStatus::Pending);
            } else {
                summary.succeeded.push(name.to_string());
            }
        }
        for (name, reason) in plan.skipped() {
            summary.skipped.push(SkippedAsset {
                name: name.to_string(),
                reason: *reason,
            });
        }
        self.recorder.persist();
        summary
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
